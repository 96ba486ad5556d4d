//! # Batch Generation
//!
//! Последовательная генерация пакета сегментов: прогревочный запрос,
//! синтез и декодирование каждого сегмента по порядку, склейка с паузами
//! и кодирование в WAV. Порядок клипов совпадает с порядком сегментов по
//! построению, сортировка не нужна. Ошибка любого сегмента прерывает весь
//! пакет; частичный результат никогда не возвращается.

use log::{debug, error, info, warn};
use tokio::sync::mpsc::Sender;

use super::types::{send_progress, ProgressUpdate, Segment, SynthesisRequest};
use super::Synthesizer;
use crate::audio::{decode_clip, encode_wav, merge_buffers, SampleBuffer, WavFile};
use crate::config::BatchConfig;
use crate::error::{Result, TtsMergeError};

/// Генератор пакета
pub struct BatchGenerator {
    config: BatchConfig,
    progress_sender: Option<Sender<ProgressUpdate>>,
}

impl BatchGenerator {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            progress_sender: None,
        }
    }

    /// Отправлять события прогресса в канал
    pub fn with_progress_sender(mut self, sender: Sender<ProgressUpdate>) -> Self {
        self.progress_sender = Some(sender);
        self
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Сгенерировать пакет и вернуть готовый WAV файл
    pub async fn generate(
        &self,
        synthesizer: &dyn Synthesizer,
        segments: &[Segment],
    ) -> Result<WavFile> {
        let merged = self.generate_buffer(synthesizer, segments).await?;

        send_progress(&self.progress_sender, ProgressUpdate::Encoding).await;
        let wav = encode_wav(&merged).map_err(|e| {
            error!("WAV encoding failed: {}", e);
            e
        })?;
        drop(merged);

        send_progress(&self.progress_sender, ProgressUpdate::Finished).await;
        info!("Batch finished: {} bytes of WAV", wav.len());
        Ok(wav)
    }

    /// Сгенерировать пакет и вернуть склеенный буфер без кодирования
    pub async fn generate_buffer(
        &self,
        synthesizer: &dyn Synthesizer,
        segments: &[Segment],
    ) -> Result<SampleBuffer> {
        let pending: Vec<(usize, &Segment)> = segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| !segment.is_blank())
            .collect();

        if pending.is_empty() {
            error!("No non-empty segments in a batch of {}", segments.len());
            return Err(TtsMergeError::NoSegments);
        }

        self.config.params.validate()?;

        let total = pending.len();
        info!(
            "Starting batch: {} segments ({} blank skipped)",
            total,
            segments.len() - total
        );
        send_progress(&self.progress_sender, ProgressUpdate::Started { total }).await;

        if self.config.warmup && !self.config.warmup_text.trim().is_empty() {
            self.warm_up(synthesizer).await;
        }

        let mut buffers = Vec::with_capacity(total);
        for (position, (index, segment)) in pending.into_iter().enumerate() {
            let current = position + 1;
            let request = SynthesisRequest {
                text: segment.text.trim().to_string(),
                voice: segment
                    .voice
                    .clone()
                    .or_else(|| self.config.default_voice.clone()),
                params: self.config.params,
            };

            send_progress(
                &self.progress_sender,
                ProgressUpdate::Synthesizing { current, total },
            )
            .await;
            debug!(
                "Synthesizing segment {} ({}/{}), voice {:?}",
                index, current, total, request.voice
            );

            let clip = synthesizer.synthesize(&request).await.map_err(|e| {
                error!("Synthesis failed for segment {}: {}", index, e);
                e.in_segment(index)
            })?;

            send_progress(
                &self.progress_sender,
                ProgressUpdate::Decoding { current, total },
            )
            .await;

            let buffer = decode_clip(&clip).map_err(|e| {
                error!("Decoding failed for segment {}: {}", index, e);
                e.in_segment(index)
            })?;
            buffers.push(buffer);
        }

        send_progress(&self.progress_sender, ProgressUpdate::Merging).await;
        let merged = merge_buffers(&buffers, self.config.gap_seconds).map_err(|e| {
            error!("Merging failed: {}", e);
            e
        })?;

        info!(
            "Merged {} clips into {:.2}s of audio",
            buffers.len(),
            merged.duration_secs()
        );
        Ok(merged)
    }

    /// Прогревочный запрос; его результат и ошибки отбрасываются
    async fn warm_up(&self, synthesizer: &dyn Synthesizer) {
        send_progress(&self.progress_sender, ProgressUpdate::WarmingUp).await;

        let request = SynthesisRequest {
            text: self.config.warmup_text.clone(),
            voice: self.config.default_voice.clone(),
            params: self.config.params,
        };

        match synthesizer.synthesize(&request).await {
            Ok(_) => debug!("Warm-up request completed"),
            Err(e) => warn!("Warm-up request failed, continuing: {}", e),
        }
    }
}
