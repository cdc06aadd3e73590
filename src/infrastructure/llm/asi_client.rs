use crate::config::LlmConfig;
use crate::errors::error::AppError;
use crate::log_debug;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 报告脱敏：去掉 HIPAA 标识符，保留医学信息
#[async_trait]
pub trait Anonymizer: Send + Sync {
    async fn anonymize(&self, report_content: &str) -> Result<String, AppError>;
}

const ANONYMIZATION_PROMPT: &str = r#"You are a medical text de-identification engine.

Your job is to:
1. Remove all 18 HIPAA identifiers from the input text. These include:
   - Names (patients, doctors, relatives)
   - Geographic subdivisions smaller than a state (street, city, ZIP, hospitals)
   - All dates directly related to the patient (except year)
   - Phone numbers, fax numbers, email addresses
   - Social Security numbers, medical record numbers, health plan numbers, account numbers, certificate/license numbers
   - Vehicle identifiers (VIN, license plates), device identifiers, URLs, IP addresses
   - Biometric identifiers (fingerprints, retina scans)
   - Full-face photos and comparable images
   - Any unique codes or characteristics that could identify the patient
2. Replace each identifier with a pseudonym or placeholder:
   - Patient names -> Patient_001, Patient_002, etc.
   - Doctors -> Doctor_A, Doctor_B
   - Dates -> shift dates or replace with [Year-YYYY] for timeline context
   - Hospitals -> Hospital_X, Hospital_Y
   - MRNs or IDs -> MRN_XXXX
3. Preserve all medical information: conditions, symptoms, procedures, medications, lab results, treatments, timelines.
4. Rewrite the text so it reads naturally, maintaining full readability and context, but ensuring no PHI/PII remains.
5. Output only the rewritten, de-identified text. Do not explain or comment on the changes."#;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

/// OpenAI 兼容的 chat/completions 客户端
pub struct AsiClient {
    http: reqwest::Client,
    config: LlmConfig,
}

impl AsiClient {
    pub fn new(config: LlmConfig) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn request_body<'a>(&'a self, report_content: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ANONYMIZATION_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: report_content,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

fn first_choice(response: ChatResponse) -> Result<String, AppError> {
    let content = response
        .choices
        .into_iter()
        .next()
        .map(|c| c.message.content.trim().to_string())
        .unwrap_or_default();
    if content.is_empty() {
        return Err(AppError::Llm("completion returned no content".to_string()));
    }
    Ok(content)
}

#[async_trait]
impl Anonymizer for AsiClient {
    async fn anonymize(&self, report_content: &str) -> Result<String, AppError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| AppError::Llm("ASI1_API_KEY environment variable is required".to_string()))?;

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        log_debug!("请求 LLM 脱敏: model={}, chars={}", self.config.model, report_content.len());

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(report_content))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Llm(format!("HTTP {}: {}", status, body)));
        }

        let parsed: ChatResponse = response.json().await?;
        first_choice(parsed)
    }
}
