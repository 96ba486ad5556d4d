//! Модуль конфигурации библиотеки tts-merge
//!
//! Этот модуль содержит структуры для настройки клиента синтеза,
//! параметров генерации и пакетной обработки.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TtsMergeError};

/// Адрес TTS сервера по умолчанию
pub const DEFAULT_BASE_URL: &str = "http://localhost:4123";

/// Пауза между сегментами по умолчанию, в секундах
pub const DEFAULT_GAP_SECONDS: f32 = 0.5;

/// Общие параметры генерации речи
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationParams {
    /// Выразительность (0.25 - 2.0)
    pub exaggeration: f32,
    /// Вес guidance (0.0 - 1.0)
    pub cfg_weight: f32,
    /// Температура сэмплирования (0.05 - 5.0)
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            exaggeration: 0.5,
            cfg_weight: 0.5,
            temperature: 0.8,
        }
    }
}

impl GenerationParams {
    /// Проверить, что параметры лежат в допустимых диапазонах
    pub fn validate(&self) -> Result<()> {
        check_range("exaggeration", self.exaggeration, 0.25, 2.0)?;
        check_range("cfg_weight", self.cfg_weight, 0.0, 1.0)?;
        check_range("temperature", self.temperature, 0.05, 5.0)?;
        Ok(())
    }
}

fn check_range(name: &str, value: f32, min: f32, max: f32) -> Result<()> {
    if !value.is_finite() || value < min || value > max {
        return Err(TtsMergeError::Configuration(format!(
            "{} must be within [{}, {}], got {}",
            name, min, max, value
        )));
    }
    Ok(())
}

/// Настройки HTTP клиента синтеза
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Базовый адрес сервера
    pub base_url: String,
    /// API ключ (Bearer), если сервер его требует
    pub api_key: Option<String>,
    /// Имя модели, передается серверу как есть
    pub model: Option<String>,
    /// Таймаут одного запроса в секундах
    pub timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            model: None,
            timeout_secs: 120,
        }
    }
}

impl ClientConfig {
    /// Переопределить настройки из переменных окружения
    ///
    /// Читает `TTS_BASE_URL`, `TTS_API_KEY`, `TTS_MODEL` и `TTS_TIMEOUT_SECS`.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("TTS_BASE_URL") {
            self.base_url = url;
        }
        if let Ok(key) = std::env::var("TTS_API_KEY") {
            if !key.trim().is_empty() {
                self.api_key = Some(key);
            }
        }
        if let Ok(model) = std::env::var("TTS_MODEL") {
            if !model.trim().is_empty() {
                self.model = Some(model);
            }
        }
        if let Ok(timeout) = std::env::var("TTS_TIMEOUT_SECS") {
            self.timeout_secs = timeout.trim().parse().map_err(|_| {
                TtsMergeError::Configuration(format!("Invalid TTS_TIMEOUT_SECS: {}", timeout))
            })?;
        }
        Ok(())
    }
}

/// Настройки пакетной генерации
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Длительность паузы между сегментами в секундах
    pub gap_seconds: f32,
    /// Голос для сегментов без назначенного голоса
    pub default_voice: Option<String>,
    /// Отправлять прогревочный запрос перед пакетом
    pub warmup: bool,
    /// Текст прогревочного запроса
    pub warmup_text: String,
    /// Параметры генерации для всех сегментов
    pub params: GenerationParams,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            gap_seconds: DEFAULT_GAP_SECONDS,
            default_voice: None,
            warmup: true,
            warmup_text: "Hello.".to_string(),
            params: GenerationParams::default(),
        }
    }
}

/// Полная конфигурация приложения
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub batch: BatchConfig,
}

impl AppConfig {
    /// Загрузить конфигурацию из JSON файла
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            TtsMergeError::Configuration(format!(
                "Failed to read config {}: {}",
                path.display(),
                e
            ))
        })?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }
}
