//! # TTS модуль
//!
//! Синтез речи через внешний сервис и пакетная генерация: по одному запросу
//! на сегмент, декодирование, склейка и кодирование в один WAV файл.

pub mod batch;
pub mod http;
pub mod types;

pub use batch::BatchGenerator;
pub use http::HttpSynthesizer;
pub use types::{send_progress, ProgressUpdate, Segment, SynthesisRequest};

use crate::audio::EncodedClip;
use crate::error::Result;

/// Сервис синтеза речи: один запрос, один закодированный клип.
///
/// Любая ошибка реализации считается фатальной для текущего пакета.
#[async_trait::async_trait]
pub trait Synthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<EncodedClip>;
}
