//! 日志模块：基于 env_logger 0.11（含颜色、文件、轮转）
//!
//! 控制台输出走 stderr，stdout 只留给 CLI 的回复内容。
use env_logger::fmt::Formatter;
use env_logger::{Builder, Target, WriteStyle};
use log::{Level, LevelFilter, Record};
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::{Mutex, Once};

// ==================== 配置常量 ====================
const LOG_DIR: &str = "LOG_DIR";
const DEFAULT_LOG_DIR: &str = "logs";
const LOG_LEVEL: &str = "LOG_LEVEL";
const DEFAULT_LOG_LEVEL: &str = "INFO";
const LOG_FILE_NAME: &str = "medical-marketplace.log";
const LOG_MAX_SIZE_MB: u64 = 10;
const LOG_MAX_ROTATIONS: usize = 5;

static INIT_LOGGER: Once = Once::new();
// 全局文件写入器
static FILE_WRITER: Mutex<Option<File>> = Mutex::new(None);

fn parse_level(raw: &str) -> Option<LevelFilter> {
    match raw {
        "TRACE" => Some(LevelFilter::Trace),
        "DEBUG" => Some(LevelFilter::Debug),
        "INFO" => Some(LevelFilter::Info),
        "WARN" => Some(LevelFilter::Warn),
        "ERROR" => Some(LevelFilter::Error),
        _ => None,
    }
}

// ==================== 初始化日志系统 ====================
pub fn init_logger() {
    INIT_LOGGER.call_once(|| {
        let log_dir = std::env::var(LOG_DIR).unwrap_or_else(|_| DEFAULT_LOG_DIR.to_string());
        let log_level = std::env::var(LOG_LEVEL)
            .unwrap_or_else(|_| DEFAULT_LOG_LEVEL.to_string())
            .to_uppercase();

        let level_filter = parse_level(&log_level).unwrap_or_else(|| {
            eprintln!("⚠️ 无效日志级别「{}」，使用默认 INFO", log_level);
            LevelFilter::Info
        });

        if let Err(e) = fs::create_dir_all(&log_dir) {
            eprintln!("❌ 创建日志目录失败: {}", e);
        }

        if let Err(e) = rotate_logs(&log_dir, LOG_FILE_NAME) {
            eprintln!("⚠️ 日志轮转失败: {}", e);
        }

        let log_file_path = Path::new(&log_dir).join(LOG_FILE_NAME);
        // 追加写入，保留之前命令的日志
        let file_enabled = match OpenOptions::new().create(true).append(true).open(&log_file_path) {
            Ok(f) => {
                if let Ok(mut writer) = FILE_WRITER.lock() {
                    *writer = Some(f);
                }
                true
            }
            Err(e) => {
                eprintln!("❌ 创建日志文件失败: {}", e);
                false
            }
        };

        let mut builder = Builder::from_default_env();
        builder
            .filter(None, level_filter)
            .filter(Some("ethers_providers"), LevelFilter::Warn)
            .filter(Some("reqwest"), LevelFilter::Warn)
            .filter(Some("hyper"), LevelFilter::Warn)
            .write_style(WriteStyle::Auto)
            .format(move |f: &mut Formatter, record: &Record| {
                let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S.%3f");

                let level_color = match record.level() {
                    Level::Error => "\x1b[91m",
                    Level::Warn => "\x1b[93m",
                    Level::Info => "\x1b[92m",
                    Level::Debug => "\x1b[96m",
                    Level::Trace => "\x1b[95m",
                };
                let reset = "\x1b[0m";
                let module = record.module_path().unwrap_or("unknown");

                let console_log = writeln!(
                    f,
                    "[{}] [{}{:>5}{}] [{}] - {}",
                    now,
                    level_color,
                    record.level(),
                    reset,
                    module,
                    record.args()
                );

                // 同时写入文件，文件写失败不影响控制台
                if file_enabled {
                    let file_log = format!(
                        "[{}] [线程: {}] [模块: {}] [级别: {}] - {}\n",
                        now,
                        std::thread::current().name().unwrap_or("unknown"),
                        module,
                        record.level(),
                        record.args()
                    );
                    if let Ok(mut writer) = FILE_WRITER.lock() {
                        if let Some(file) = writer.as_mut() {
                            let _ = file.write_all(file_log.as_bytes());
                        }
                    }
                }

                console_log
            })
            .target(Target::Stderr);

        if let Err(e) = builder.try_init() {
            eprintln!("❌ 控制台日志初始化失败: {}", e);
        } else {
            log::debug!(
                "日志系统初始化完成 | 级别: {} | 日志文件: {}",
                log_level,
                log_file_path.display()
            );
        }
    });
}

// ==================== 日志轮转 ====================
fn rotate_logs(log_dir: &str, log_file: &str) -> io::Result<()> {
    let log_path = Path::new(log_dir).join(log_file);

    if !log_path.exists() {
        return Ok(());
    }

    let file_size_mb = fs::metadata(&log_path)?.len() / (1024 * 1024);
    if file_size_mb < LOG_MAX_SIZE_MB {
        return Ok(());
    }

    for i in (1..LOG_MAX_ROTATIONS).rev() {
        let src = Path::new(log_dir).join(format!("{}.{}", log_file, i));
        let dest = Path::new(log_dir).join(format!("{}.{}", log_file, i + 1));
        if src.exists() {
            fs::rename(&src, &dest)?;
        }
    }

    let rotated = Path::new(log_dir).join(format!("{}.1", log_file));
    fs::rename(&log_path, &rotated)?;
    File::create(&log_path)?;
    Ok(())
}

// ==================== 便捷日志宏 ====================
#[macro_export]
macro_rules! log_trace { ($($arg:tt)*) => { log::trace!($($arg)*) }; }
#[macro_export]
macro_rules! log_debug { ($($arg:tt)*) => { log::debug!($($arg)*) }; }
#[macro_export]
macro_rules! log_info  { ($($arg:tt)*) => { log::info!($($arg)*) }; }
#[macro_export]
macro_rules! log_warn  { ($($arg:tt)*) => { log::warn!($($arg)*) }; }
#[macro_export]
macro_rules! log_error { ($($arg:tt)*) => { log::error!($($arg)*) }; }
