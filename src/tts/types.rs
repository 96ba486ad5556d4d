//! # TTS Types
//!
//! Общие типы данных пакетной генерации: входные сегменты, запрос к
//! сервису синтеза и события прогресса.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::Sender;

use crate::config::GenerationParams;

/// Один входной сегмент: текст и, возможно, назначенный ему голос.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Текст для озвучивания
    pub text: String,
    /// Голос сегмента; `None` означает голос пакета по умолчанию
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<String>,
}

impl Segment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    /// Пустой или состоящий из пробелов текст
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Запрос на синтез одного клипа
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRequest {
    pub text: String,
    pub voice: Option<String>,
    pub params: GenerationParams,
}

/// Обновление прогресса пакетной генерации
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressUpdate {
    /// Началась обработка
    Started { total: usize },
    /// Прогревочный запрос
    WarmingUp,
    /// Синтез сегмента
    Synthesizing {
        /// Номер сегмента, начиная с 1
        current: usize,
        total: usize,
    },
    /// Декодирование полученного клипа
    Decoding { current: usize, total: usize },
    /// Склейка клипов
    Merging,
    /// Кодирование WAV
    Encoding,
    /// Обработка завершена
    Finished,
}

/// Асинхронно отправляет обновление прогресса.
///
/// Закрытый приемник не считается ошибкой.
pub async fn send_progress(sender: &Option<Sender<ProgressUpdate>>, update: ProgressUpdate) {
    if let Some(sender) = sender {
        let _ = sender.send(update).await;
    }
}
