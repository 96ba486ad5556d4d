//! # Audio
//!
//! Декодирование клипов, склейка буферов с паузами и кодирование в WAV.
//! Все операции работают с планарным буфером [`SampleBuffer`].

pub mod decoder;
pub mod merge;
pub mod wav;

pub use decoder::{decode_clip, EncodedClip};
pub use merge::{gap_frames, max_wav_frames, merge_buffers};
pub use wav::{encode_wav, quantize_sample, WavFile};

use crate::error::{Result, TtsMergeError};

/// Декодированное аудио: по одному массиву семплов f32 на канал.
///
/// Инвариант: каналов не меньше одного, все каналы одной длины,
/// частота дискретизации больше нуля.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    sample_rate: u32,
    channels: Vec<Vec<f32>>,
}

impl SampleBuffer {
    /// Создать буфер из планарных каналов
    pub fn new(sample_rate: u32, channels: Vec<Vec<f32>>) -> Result<Self> {
        if sample_rate == 0 {
            return Err(TtsMergeError::InvalidBuffer(
                "sample rate must be positive".to_string(),
            ));
        }
        let frames = match channels.first() {
            Some(first) => first.len(),
            None => {
                return Err(TtsMergeError::InvalidBuffer(
                    "at least one channel is required".to_string(),
                ))
            }
        };
        if let Some((ch, data)) = channels
            .iter()
            .enumerate()
            .find(|(_, data)| data.len() != frames)
        {
            return Err(TtsMergeError::InvalidBuffer(format!(
                "channel {} has {} samples, expected {}",
                ch,
                data.len(),
                frames
            )));
        }
        Ok(Self {
            sample_rate,
            channels,
        })
    }

    /// Буфер тишины заданного размера
    pub fn silent(channel_count: usize, frame_count: usize, sample_rate: u32) -> Result<Self> {
        Self::new(sample_rate, vec![vec![0.0; frame_count]; channel_count])
    }

    /// Создать буфер из перемежающихся (interleaved) семплов
    pub fn from_interleaved(samples: &[f32], channel_count: usize, sample_rate: u32) -> Result<Self> {
        if channel_count == 0 {
            return Err(TtsMergeError::InvalidBuffer(
                "at least one channel is required".to_string(),
            ));
        }
        if samples.len() % channel_count != 0 {
            return Err(TtsMergeError::InvalidBuffer(format!(
                "{} interleaved samples do not divide into {} channels",
                samples.len(),
                channel_count
            )));
        }
        let frames = samples.len() / channel_count;
        let mut channels = vec![Vec::with_capacity(frames); channel_count];
        for frame in samples.chunks_exact(channel_count) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }
        Self::new(sample_rate, channels)
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn frame_count(&self) -> usize {
        self.channels[0].len()
    }

    /// Семплы канала `index`
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Длительность в секундах
    pub fn duration_secs(&self) -> f64 {
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Семплы в перемежающемся порядке: кадр за кадром, канал за каналом
    pub fn to_interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.frame_count() * self.channel_count());
        for frame in 0..self.frame_count() {
            for channel in &self.channels {
                out.push(channel[frame]);
            }
        }
        out
    }

    /// Изменяемый доступ к каналам для склейки внутри крейта
    pub(crate) fn channels_mut(&mut self) -> &mut [Vec<f32>] {
        &mut self.channels
    }
}
