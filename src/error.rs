//! Модуль обработки ошибок библиотеки tts-merge
//!
//! Все ошибки конвейера (синтез, декодирование, склейка, кодирование WAV)
//! сведены в одно перечисление, чтобы пакетная генерация завершалась
//! одной итоговой ошибкой.

use thiserror::Error;

/// Ошибки библиотеки tts-merge
#[derive(Debug, Error)]
pub enum TtsMergeError {
    /// Не удалось декодировать аудиоклип
    #[error("Decode error: {0}")]
    Decode(String),

    /// Ошибка внешнего сервиса синтеза (включая сеть и таймауты)
    #[error("Synthesis error: {0}")]
    Synthesis(String),

    /// Пустой список буферов для склейки
    #[error("Nothing to merge: the buffer list is empty")]
    EmptyInput,

    /// После фильтрации пустых строк не осталось сегментов
    #[error("No segments to synthesize")]
    NoSegments,

    /// Ошибка кодирования WAV
    #[error("Encode error: {0}")]
    Encode(String),

    /// Частота дискретизации буфера отличается от частоты первого буфера
    #[error("Sample rate mismatch in buffer {index}: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch {
        index: usize,
        expected: u32,
        found: u32,
    },

    /// Нарушен инвариант SampleBuffer
    #[error("Invalid sample buffer: {0}")]
    InvalidBuffer(String),

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Сегмент пакета завершился ошибкой, пакет прерван
    #[error("Segment {index} failed: {source}")]
    Segment {
        index: usize,
        #[source]
        source: Box<TtsMergeError>,
    },

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(String),
}

impl TtsMergeError {
    /// Обернуть ошибку в контекст сегмента с индексом `index`
    pub fn in_segment(self, index: usize) -> Self {
        TtsMergeError::Segment {
            index,
            source: Box::new(self),
        }
    }
}

impl From<&str> for TtsMergeError {
    fn from(s: &str) -> Self {
        TtsMergeError::Other(s.to_string())
    }
}

impl From<String> for TtsMergeError {
    fn from(s: String) -> Self {
        TtsMergeError::Other(s)
    }
}

/// Тип Result для библиотеки tts-merge
pub type Result<T> = std::result::Result<T, TtsMergeError>;
