//! # HTTP TTS Client
//!
//! Клиент OpenAI-совместимого сервера синтеза речи
//! (`POST {base_url}/v1/audio/speech`). Ответ сервера возвращается как
//! [`EncodedClip`] без декодирования. Повторные попытки не выполняются.

use std::time::Duration;

use log::{debug, error, info};
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;

use super::{SynthesisRequest, Synthesizer};
use crate::audio::EncodedClip;
use crate::config::ClientConfig;
use crate::error::{Result, TtsMergeError};

/// Тело запроса к `/v1/audio/speech`
#[derive(Debug, Serialize)]
struct SpeechRequestBody<'a> {
    input: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    voice: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    exaggeration: f32,
    cfg_weight: f32,
    temperature: f32,
    response_format: &'a str,
}

/// Синтезатор, работающий через HTTP API
pub struct HttpSynthesizer {
    client: Client,
    config: ClientConfig,
}

impl HttpSynthesizer {
    /// Создать клиент с таймаутом из конфигурации
    pub fn new(config: ClientConfig) -> Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(TtsMergeError::Configuration(
                "TTS base URL is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header(header::AUTHORIZATION, format!("Bearer {}", key)),
            None => builder,
        }
    }

    /// Проверить доступность сервера (`GET /health`)
    pub async fn check_health(&self) -> Result<bool> {
        let url = self.endpoint("/health");
        debug!("Checking TTS server health at {}", url);

        let response = self.authorize(self.client.get(&url)).send().await?;
        let healthy = response.status().is_success();
        if healthy {
            info!("TTS server at {} is available", self.config.base_url);
        } else {
            error!(
                "TTS server health check failed with status {}",
                response.status()
            );
        }
        Ok(healthy)
    }
}

#[async_trait::async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<EncodedClip> {
        let body = build_request_body(request, self.config.model.as_deref());
        let url = self.endpoint("/v1/audio/speech");

        debug!(
            "Sending TTS request ({} chars, voice {:?})",
            request.text.len(),
            request.voice
        );

        let response = self
            .authorize(self.client.post(&url))
            .json(&body)
            .send()
            .await
            .map_err(|e| TtsMergeError::Synthesis(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|e| format!("Failed to read error response: {}", e));
            let message = extract_error_message(&error_text);
            error!("TTS API error (status {}): {}", status, message);
            return Err(TtsMergeError::Synthesis(format!(
                "API error ({}): {}",
                status, message
            )));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TtsMergeError::Synthesis(format!("failed to read audio response: {}", e)))?;

        if bytes.is_empty() {
            return Err(TtsMergeError::Synthesis(
                "received empty audio response".to_string(),
            ));
        }

        debug!("Received {} bytes of audio", bytes.len());

        let clip = EncodedClip::new(bytes);
        Ok(match content_type {
            Some(content_type) => clip.with_content_type(content_type),
            None => clip,
        })
    }
}

fn build_request_body<'a>(
    request: &'a SynthesisRequest,
    model: Option<&'a str>,
) -> SpeechRequestBody<'a> {
    SpeechRequestBody {
        input: &request.text,
        voice: request.voice.as_deref(),
        model,
        exaggeration: request.params.exaggeration,
        cfg_weight: request.params.cfg_weight,
        temperature: request.params.temperature,
        response_format: "wav",
    }
}

/// Достает текст ошибки из ответа сервера.
///
/// Понимает `{"error": {"message": ...}}`, `{"error": "..."}` и `{"detail": ...}`;
/// иначе возвращает тело как есть.
fn extract_error_message(body: &str) -> String {
    let json: Value = match serde_json::from_str(body) {
        Ok(json) => json,
        Err(_) => return body.trim().to_string(),
    };

    if let Some(message) = json["error"]["message"].as_str() {
        return message.to_string();
    }
    if let Some(message) = json["error"].as_str() {
        return message.to_string();
    }
    match &json["detail"] {
        Value::String(detail) => detail.clone(),
        Value::Null => body.trim().to_string(),
        other => other.to_string(),
    }
}
