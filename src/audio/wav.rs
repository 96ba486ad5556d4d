//! # WAV Encoding
//!
//! Сериализация [`SampleBuffer`] в канонический WAV: 44-байтовый заголовок
//! RIFF/WAVE и перемежающиеся 16-битные PCM семплы little-endian.
//!
//! ```text
//!  0  "RIFF"            4  36 + data_len      8  "WAVE"
//! 12  "fmt "           16  16                20  1 (PCM)
//! 22  channels         24  sample_rate       28  byte_rate
//! 32  block_align      34  16 (bits)         36  "data"
//! 40  data_len         44  samples...
//! ```

use std::path::Path;

use base64::{engine::general_purpose, Engine as _};
use log::info;

use super::SampleBuffer;
use crate::error::{Result, TtsMergeError};

/// Размер канонического заголовка WAV
pub const WAV_HEADER_LEN: usize = 44;

const BITS_PER_SAMPLE: u16 = 16;
pub(crate) const BYTES_PER_SAMPLE: usize = 2;

/// Готовый WAV файл в памяти.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WavFile {
    bytes: Vec<u8>,
}

impl WavFile {
    /// Обернуть готовые байты WAV, проверив сигнатуры заголовка
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.len() < WAV_HEADER_LEN || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
            return Err(TtsMergeError::Decode(
                "not a RIFF/WAVE byte stream".to_string(),
            ));
        }
        Ok(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Байты PCM данных без заголовка
    pub fn data(&self) -> &[u8] {
        &self.bytes[WAV_HEADER_LEN..]
    }

    /// Записать файл на диск
    pub fn write_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        std::fs::write(path.as_ref(), &self.bytes)?;
        info!(
            "Saved WAV file: {} ({} bytes)",
            path.as_ref().display(),
            self.bytes.len()
        );
        Ok(())
    }

    /// Base64 копия для хранения в сессии
    pub fn to_base64(&self) -> String {
        general_purpose::STANDARD.encode(&self.bytes)
    }

    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| TtsMergeError::Decode(format!("invalid base64 audio: {}", e)))?;
        Self::from_bytes(bytes)
    }
}

/// Квантует семпл f32 в 16-битный PCM.
///
/// Семпл ограничивается диапазоном [-1.0, 1.0]; отрицательные значения
/// умножаются на 32768, неотрицательные на 32767, дробная часть
/// отбрасывается. NaN кодируется как тишина.
pub fn quantize_sample(sample: f32) -> i16 {
    if sample.is_nan() {
        return 0;
    }
    let s = sample.clamp(-1.0, 1.0);
    if s < 0.0 {
        (s * 32768.0) as i16
    } else {
        (s * 32767.0) as i16
    }
}

/// Кодирует буфер в WAV файл длиной ровно `44 + frames * channels * 2` байт.
///
/// # Ошибки
///
/// `Encode`, если число каналов, длина данных или байтрейт не помещаются
/// в поля заголовка.
pub fn encode_wav(buffer: &SampleBuffer) -> Result<WavFile> {
    let channels = u16::try_from(buffer.channel_count()).map_err(|_| {
        TtsMergeError::Encode(format!("too many channels: {}", buffer.channel_count()))
    })?;
    let block_align = channels
        .checked_mul(BYTES_PER_SAMPLE as u16)
        .ok_or_else(|| TtsMergeError::Encode(format!("too many channels: {}", channels)))?;
    let byte_rate = buffer
        .sample_rate()
        .checked_mul(block_align as u32)
        .ok_or_else(|| {
            TtsMergeError::Encode(format!(
                "byte rate overflows for {} Hz x {} channels",
                buffer.sample_rate(),
                channels
            ))
        })?;
    let data_len = buffer
        .frame_count()
        .checked_mul(block_align as usize)
        .and_then(|len| u32::try_from(len).ok())
        .filter(|len| len.checked_add(36).is_some())
        .ok_or_else(|| {
            TtsMergeError::Encode(format!(
                "{} frames do not fit in a WAV data chunk",
                buffer.frame_count()
            ))
        })?;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);

    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_len).to_le_bytes());
    wav.extend_from_slice(b"WAVE");
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes());
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM
    wav.extend_from_slice(&channels.to_le_bytes());
    wav.extend_from_slice(&buffer.sample_rate().to_le_bytes());
    wav.extend_from_slice(&byte_rate.to_le_bytes());
    wav.extend_from_slice(&block_align.to_le_bytes());
    wav.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_len.to_le_bytes());

    for frame in 0..buffer.frame_count() {
        for channel in buffer.channels() {
            wav.extend_from_slice(&quantize_sample(channel[frame]).to_le_bytes());
        }
    }

    Ok(WavFile { bytes: wav })
}
