//! Основной файл библиотеки tts-merge
//!
//! Библиотека отправляет список текстовых сегментов во внешний TTS сервис,
//! декодирует полученные клипы, склеивает их с паузами по 0.5 секунды и
//! кодирует результат в один канонический 16-битный PCM WAV.

pub mod audio;
pub mod config;
pub mod error;
pub mod script;
pub mod session;
pub mod tts;
pub mod utils;

pub use crate::audio::{EncodedClip, SampleBuffer, WavFile};
pub use crate::config::{AppConfig, BatchConfig, ClientConfig, GenerationParams};
pub use crate::error::{Result, TtsMergeError};
pub use crate::tts::{BatchGenerator, HttpSynthesizer, ProgressUpdate, Segment, Synthesizer};

/// Публичный API для удобного использования: пакет с параметрами
/// `params` и настройками по умолчанию.
///
/// `default_voice` получают сегменты без своего голоса и прогревочный запрос.
pub async fn generate_batch(
    segments: &[Segment],
    params: GenerationParams,
    default_voice: Option<&str>,
    synthesizer: &dyn Synthesizer,
) -> Result<WavFile> {
    let config = BatchConfig {
        params,
        default_voice: default_voice.map(str::to_string),
        ..BatchConfig::default()
    };
    BatchGenerator::new(config)
        .generate(synthesizer, segments)
        .await
}
