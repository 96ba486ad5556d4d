//! # Audio Decoding
//!
//! Декодирование аудиоклипов, полученных от сервиса синтеза, в [`SampleBuffer`].
//!
//! WAV декодируется через hound (8/16/24/32 бит, целые и float). Все прочие
//! форматы, а также варианты WAV, которые hound не поддерживает, идут через
//! универсальный декодер Symphonia. Каналы не сводятся в моно.
//!
//! Поврежденный пакет или поток короче объявленной в заголовке длины
//! считаются ошибкой декодирования: укороченный клип не возвращается.

use std::io::Cursor;

use bytes::Bytes;
use hound::{SampleFormat, WavReader};
use log::{debug, warn};
use symphonia::core::audio::SampleBuffer as SymphoniaSampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::SampleBuffer;
use crate::error::{Result, TtsMergeError};

/// Закодированный аудиоклип в формате контейнера, как его вернул сервис синтеза.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedClip {
    bytes: Bytes,
    content_type: Option<String>,
}

impl EncodedClip {
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    /// Указать MIME тип ответа, используется как подсказка формата
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn looks_like_wav(&self) -> bool {
        self.bytes.len() >= 12 && &self.bytes[0..4] == b"RIFF" && &self.bytes[8..12] == b"WAVE"
    }

    /// Расширение файла для подсказки Symphonia
    fn extension_hint(&self) -> Option<&'static str> {
        let content_type = self.content_type.as_deref()?;
        let mime = content_type.split(';').next().unwrap_or("").trim();
        match mime.to_ascii_lowercase().as_str() {
            "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => Some("wav"),
            "audio/mpeg" | "audio/mp3" => Some("mp3"),
            "audio/aac" | "audio/mp4" | "audio/x-m4a" => Some("m4a"),
            _ => None,
        }
    }
}

/// Декодирует клип в планарный буфер f32.
///
/// # Ошибки
///
/// `Decode`, если данные пусты, формат не распознан, нет аудио-трека,
/// не удалось создать декодер, пакет поврежден, поток оборвался раньше
/// объявленной длины или не удалось определить раскладку каналов.
pub fn decode_clip(clip: &EncodedClip) -> Result<SampleBuffer> {
    if clip.is_empty() {
        return Err(TtsMergeError::Decode("empty audio clip".to_string()));
    }

    let buffer = if clip.looks_like_wav() {
        match decode_wav(clip.as_bytes()) {
            Ok(buffer) => buffer,
            Err(WavFallback::Unsupported(reason)) => {
                debug!("hound cannot read this WAV ({}), falling back to symphonia", reason);
                decode_with_symphonia(clip)?
            }
            Err(WavFallback::Failed(err)) => return Err(err),
        }
    } else {
        decode_with_symphonia(clip)?
    };

    debug!(
        "Decoded clip: {} frames, {} channels, {} Hz",
        buffer.frame_count(),
        buffer.channel_count(),
        buffer.sample_rate()
    );
    Ok(buffer)
}

enum WavFallback {
    Unsupported(String),
    Failed(TtsMergeError),
}

fn decode_wav(bytes: &[u8]) -> std::result::Result<SampleBuffer, WavFallback> {
    let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| match e {
        hound::Error::Unsupported => WavFallback::Unsupported("unsupported WAV layout".to_string()),
        other => WavFallback::Failed(TtsMergeError::Decode(format!("invalid WAV: {}", other))),
    })?;

    let spec = reader.spec();
    let samples: std::result::Result<Vec<f32>, hound::Error> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, bits @ (8 | 16 | 24 | 32)) => {
            let scale = (1u64 << (bits - 1)) as f32;
            reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect()
        }
        (SampleFormat::Float, 32) => reader.into_samples::<f32>().collect(),
        (format, bits) => {
            return Err(WavFallback::Unsupported(format!("{:?}, {} bits", format, bits)));
        }
    };
    let samples = samples.map_err(|e| {
        WavFallback::Failed(TtsMergeError::Decode(format!("invalid WAV samples: {}", e)))
    })?;

    SampleBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)
        .map_err(|e| WavFallback::Failed(TtsMergeError::Decode(e.to_string())))
}

fn decode_with_symphonia(clip: &EncodedClip) -> Result<SampleBuffer> {
    let cursor = Cursor::new(clip.as_bytes().to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(extension) = clip.extension_hint() {
        hint.with_extension(extension);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| TtsMergeError::Decode(format!("Failed to probe format: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| TtsMergeError::Decode("No audio track found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channel_count = track.codec_params.channels.map(|c| c.count());
    let declared_frames = track.codec_params.n_frames;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| TtsMergeError::Decode(format!("Failed to create decoder: {}", e)))?;

    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => {
                return Err(TtsMergeError::Decode(format!("Error reading packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = Some(spec.rate);
                channel_count = Some(spec.channels.count());

                let mut sample_buf =
                    SymphoniaSampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                sample_buf.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(sample_buf.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                warn!("Corrupt packet at {} samples: {}", interleaved.len(), e);
                return Err(TtsMergeError::Decode(format!("Corrupt packet: {}", e)));
            }
            Err(e) => {
                return Err(TtsMergeError::Decode(format!("Decode failed: {}", e)));
            }
        }
    }

    let sample_rate = sample_rate
        .ok_or_else(|| TtsMergeError::Decode("Sample rate not found".to_string()))?;
    let channel_count = channel_count
        .filter(|&c| c > 0)
        .ok_or_else(|| TtsMergeError::Decode("Channel layout not found".to_string()))?;

    let decoded_frames = (interleaved.len() / channel_count) as u64;
    if let Some(expected) = declared_frames {
        if decoded_frames < expected {
            warn!(
                "Clip is truncated: {} of {} frames decoded",
                decoded_frames, expected
            );
            return Err(TtsMergeError::Decode(format!(
                "truncated clip: {} of {} frames",
                decoded_frames, expected
            )));
        }
    }

    SampleBuffer::from_interleaved(&interleaved, channel_count, sample_rate)
        .map_err(|e| TtsMergeError::Decode(e.to_string()))
}
