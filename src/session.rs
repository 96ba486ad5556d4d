//! Состояние сессии
//!
//! Строки сценария, назначения голосов, параметры генерации и base64 копия
//! последнего склеенного WAV, чтобы результат переживал перезапуск.
//! Конвейер сам состояния не хранит: вызывающий код загружает сессию,
//! передает из нее сегменты и сохраняет результат обратно.

use std::collections::BTreeMap;
use std::path::Path;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::audio::WavFile;
use crate::config::GenerationParams;
use crate::error::Result;
use crate::script::{assign_voices, ScriptLine};
use crate::tts::Segment;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionState {
    /// Строки сценария
    pub lines: Vec<ScriptLine>,
    /// Голос для каждого говорящего
    pub voice_assignments: BTreeMap<String, String>,
    /// Параметры генерации
    pub params: GenerationParams,
    /// Последний результат, WAV в base64
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_audio: Option<String>,
}

impl SessionState {
    /// Загрузить сессию; отсутствующий файл дает пустую сессию
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_or(path, GenerationParams::default())
    }

    /// Загрузить сессию; для отсутствующего файла начать новую сессию
    /// с параметрами `params`. Параметры сохраненной сессии не заменяются.
    pub fn load_or<P: AsRef<Path>>(path: P, params: GenerationParams) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No session at {}, starting fresh", path.display());
            return Ok(Self {
                params,
                ..Self::default()
            });
        }
        let content = std::fs::read_to_string(path)?;
        let state = serde_json::from_str(&content)?;
        Ok(state)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        info!("Session saved to {}", path.as_ref().display());
        Ok(())
    }

    /// Сегменты с голосами, назначенными по говорящим
    pub fn segments(&self) -> Vec<Segment> {
        assign_voices(&self.lines, &self.voice_assignments)
    }

    pub fn set_merged_audio(&mut self, wav: &WavFile) {
        self.merged_audio = Some(wav.to_base64());
    }

    pub fn merged_audio(&self) -> Result<Option<WavFile>> {
        self.merged_audio
            .as_deref()
            .map(WavFile::from_base64)
            .transpose()
    }

    pub fn clear_merged_audio(&mut self) {
        self.merged_audio = None;
    }
}
