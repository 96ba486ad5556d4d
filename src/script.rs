//! Модуль для разбора текстовых сценариев
//!
//! Сценарий: обычный текст, одна строка на сегмент. Строка вида
//! `[speaker] text` назначает текст говорящему `speaker`, остальные
//! непустые строки получают говорящего `default`. Пустые строки
//! отбрасываются.

use std::collections::BTreeMap;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TtsMergeError};
use crate::tts::Segment;

/// Говорящий для строк без метки
pub const DEFAULT_SPEAKER: &str = "default";

lazy_static! {
    static ref SPEAKER_LINE: Regex = Regex::new(r"^\[([^\]]+)\]\s*(.+)$").unwrap();
}

/// Строка сценария
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptLine {
    pub speaker: String,
    pub text: String,
}

/// Разбор текста сценария
pub fn parse_script(input: &str) -> Vec<ScriptLine> {
    input
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| match SPEAKER_LINE.captures(line) {
            Some(caps) => ScriptLine {
                speaker: caps[1].trim().to_string(),
                text: caps[2].trim().to_string(),
            },
            None => ScriptLine {
                speaker: DEFAULT_SPEAKER.to_string(),
                text: line.to_string(),
            },
        })
        .collect()
}

/// Разбор файла сценария
pub fn parse_script_file<P: AsRef<Path>>(path: P) -> Result<Vec<ScriptLine>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| {
        TtsMergeError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read script {}: {}", path.display(), e),
        ))
    })?;
    Ok(parse_script(&content))
}

/// Говорящие в порядке первого появления, без повторов
pub fn speakers(lines: &[ScriptLine]) -> Vec<String> {
    let mut seen = Vec::new();
    for line in lines {
        if !seen.contains(&line.speaker) {
            seen.push(line.speaker.clone());
        }
    }
    seen
}

/// Превращает строки в сегменты, назначая голос по говорящему.
///
/// Голос определяется один раз здесь; говорящий без назначения получает
/// `voice: None`, то есть голос пакета по умолчанию.
pub fn assign_voices(lines: &[ScriptLine], assignments: &BTreeMap<String, String>) -> Vec<Segment> {
    lines
        .iter()
        .map(|line| Segment {
            text: line.text.clone(),
            voice: assignments.get(&line.speaker).cloned(),
        })
        .collect()
}
