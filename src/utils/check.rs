use crate::errors::error::AppError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use ethers_core::types::Address;

/// 解析 0x 开头的 20 字节账户地址
pub fn parse_address(value: &str) -> Result<Address, AppError> {
    let trimmed = value.trim();
    if !trimmed.starts_with("0x") || trimmed.len() != 42 {
        return Err(AppError::InvalidAddress(value.to_string()));
    }
    trimmed
        .parse::<Address>()
        .map_err(|_| AppError::InvalidAddress(value.to_string()))
}

/// 检测日期支持 YYYY-MM-DD 或 YYYY-MM-DDTHH:MM:SS，统一按 UTC 处理
pub fn parse_test_date(value: &str) -> Result<DateTime<Utc>, AppError> {
    let trimmed = value.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S") {
        return Ok(dt.and_utc());
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
        .ok_or_else(|| {
            AppError::Validation(
                "Invalid date format. Please use YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS.".to_string(),
            )
        })
}

pub fn validate_email(value: &str) -> Result<(), AppError> {
    let trimmed = value.trim();
    let valid = match trimmed.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if valid {
        Ok(())
    } else {
        Err(AppError::Validation(format!("Invalid email address: {}", value)))
    }
}

pub fn require_non_empty(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    #[test]
    fn accepts_both_date_forms() {
        let day = parse_test_date("2024-03-15").unwrap();
        assert_eq!((day.year(), day.month(), day.day()), (2024, 3, 15));
        assert_eq!(day.hour(), 0);

        let with_time = parse_test_date("2024-03-15T09:30:00").unwrap();
        assert_eq!((with_time.hour(), with_time.minute()), (9, 30));
    }

    #[test]
    fn rejects_malformed_dates() {
        assert!(parse_test_date("15/03/2024").is_err());
        assert!(parse_test_date("2024-13-01").is_err());
        assert!(parse_test_date("").is_err());
    }

    #[test]
    fn address_must_be_full_hex() {
        assert!(parse_address("0x70997970C51812dc3A010C7d01b50e0d17dc79C8").is_ok());
        assert!(parse_address("70997970C51812dc3A010C7d01b50e0d17dc79C8").is_err());
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xZZ997970C51812dc3A010C7d01b50e0d17dc79C8").is_err());
    }

    #[test]
    fn email_needs_local_part_and_domain() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice@example").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice.example.com").is_err());
    }
}
