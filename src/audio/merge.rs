//! Склейка аудиобуферов с паузами тишины между ними.

use log::{debug, warn};

use super::wav::{BYTES_PER_SAMPLE, WAV_HEADER_LEN};
use super::SampleBuffer;
use crate::error::{Result, TtsMergeError};

/// Количество кадров паузы длительностью `gap_seconds` при частоте `sample_rate`.
///
/// Слишком большие значения насыщаются до `usize::MAX`; `merge_buffers`
/// проверяет длительность паузы до вызова.
pub fn gap_frames(sample_rate: u32, gap_seconds: f32) -> usize {
    (sample_rate as f64 * gap_seconds as f64).round() as usize
}

/// Наибольшее число кадров, которое помещается в поле длины данных WAV
pub fn max_wav_frames(channel_count: usize) -> usize {
    let max_data_len = (u32::MAX as usize).saturating_sub(WAV_HEADER_LEN - 8);
    max_data_len / (channel_count.max(1) * BYTES_PER_SAMPLE)
}

/// Склеивает буферы по порядку, вставляя между соседними буферами
/// `gap_seconds` секунд тишины. После последнего буфера пауза не добавляется.
///
/// Число каналов и частота результата берутся из первого буфера.
/// Буферы с другой частотой дискретизации отклоняются, ресемплинг не
/// выполняется. Если у буфера меньше каналов, недостающие каналы остаются
/// тихими; лишние каналы отбрасываются.
///
/// # Ошибки
///
/// * `EmptyInput` - список буферов пуст
/// * `SampleRateMismatch` - частота буфера отличается от частоты первого
/// * `Configuration` - длительность паузы отрицательная или не конечная,
///   либо результат не поместится в WAV файл
pub fn merge_buffers(buffers: &[SampleBuffer], gap_seconds: f32) -> Result<SampleBuffer> {
    let first = buffers.first().ok_or(TtsMergeError::EmptyInput)?;

    if !gap_seconds.is_finite() || gap_seconds < 0.0 {
        return Err(TtsMergeError::Configuration(format!(
            "gap must be a non-negative number of seconds, got {}",
            gap_seconds
        )));
    }

    let sample_rate = first.sample_rate();
    let channel_count = first.channel_count();

    if let Some((index, mismatched)) = buffers
        .iter()
        .enumerate()
        .find(|(_, b)| b.sample_rate() != sample_rate)
    {
        return Err(TtsMergeError::SampleRateMismatch {
            index,
            expected: sample_rate,
            found: mismatched.sample_rate(),
        });
    }

    let max_frames = max_wav_frames(channel_count);
    if sample_rate as f64 * gap_seconds as f64 > max_frames as f64 {
        return Err(TtsMergeError::Configuration(format!(
            "gap of {} s at {} Hz does not fit in a WAV file",
            gap_seconds, sample_rate
        )));
    }

    let gap = gap_frames(sample_rate, gap_seconds);
    let total_frames = buffers
        .iter()
        .try_fold(0usize, |acc, b| acc.checked_add(b.frame_count()))
        .and_then(|clips| {
            gap.checked_mul(buffers.len() - 1)
                .and_then(|gaps| clips.checked_add(gaps))
        })
        .filter(|&total| total <= max_frames)
        .ok_or_else(|| {
            TtsMergeError::Configuration(format!(
                "{} clips with a {} s gap exceed the WAV size limit of {} frames",
                buffers.len(),
                gap_seconds,
                max_frames
            ))
        })?;

    debug!(
        "Merging {} buffers: {} frames, {} channels, {} Hz, gap {} frames",
        buffers.len(),
        total_frames,
        channel_count,
        sample_rate,
        gap
    );

    let mut merged = SampleBuffer::silent(channel_count, total_frames, sample_rate)?;
    let mut offset = 0;

    for (index, buffer) in buffers.iter().enumerate() {
        if buffer.channel_count() > channel_count {
            warn!(
                "Buffer {} has {} channels, keeping the first {}",
                index,
                buffer.channel_count(),
                channel_count
            );
        }

        let frames = buffer.frame_count();
        for (out, input) in merged.channels_mut().iter_mut().zip(buffer.channels()) {
            out[offset..offset + frames].copy_from_slice(input);
        }

        offset += frames;
        if index + 1 < buffers.len() {
            offset += gap;
        }
    }

    Ok(merged)
}
