//! Тесты пакетной генерации с подменным синтезатором
//!
//! Подмена возвращает WAV 32-бит float, чтобы значения семплов
//! доходили до склейки без потерь.

use std::io::Cursor;
use std::sync::Mutex;

use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::sync::mpsc;

use crate::audio::EncodedClip;
use crate::config::{BatchConfig, GenerationParams};
use crate::error::{Result, TtsMergeError};
use crate::tts::{BatchGenerator, ProgressUpdate, Segment, SynthesisRequest, Synthesizer};

/// Одна секунда моно 16 кГц постоянной амплитуды
fn constant_clip(value: f32) -> Vec<u8> {
    let spec = WavSpec {
        channels: 1,
        sample_rate: 16000,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).unwrap();
        for _ in 0..16000 {
            writer.write_sample(value).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

struct StubSynthesizer {
    clip: Vec<u8>,
    fail_on: Option<String>,
    garbage_on: Option<String>,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl StubSynthesizer {
    fn new() -> Self {
        Self {
            clip: constant_clip(0.5),
            fail_on: None,
            garbage_on: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing_on(mut self, text: &str) -> Self {
        self.fail_on = Some(text.to_string());
        self
    }

    fn garbage_on(mut self, text: &str) -> Self {
        self.garbage_on = Some(text.to_string());
        self
    }

    fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Synthesizer for StubSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<EncodedClip> {
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_on.as_deref() == Some(request.text.as_str()) {
            return Err(TtsMergeError::Synthesis("stubbed upstream failure".to_string()));
        }
        if self.garbage_on.as_deref() == Some(request.text.as_str()) {
            return Ok(EncodedClip::new(b"<html>502 Bad Gateway</html>".to_vec()));
        }
        Ok(EncodedClip::new(self.clip.clone()).with_content_type("audio/wav"))
    }
}

fn pcm_samples(bytes: &[u8]) -> Vec<i16> {
    bytes[44..]
        .chunks_exact(2)
        .map(|b| i16::from_le_bytes([b[0], b[1]]))
        .collect()
}

#[tokio::test]
async fn test_two_segments_end_to_end() {
    let synth = StubSynthesizer::new();
    let segments = vec![Segment::new("Hello"), Segment::new("World")];

    let wav = BatchGenerator::new(BatchConfig::default())
        .generate(&synth, &segments)
        .await
        .unwrap();

    assert_eq!(wav.len(), 44 + 40000 * 2);
    let samples = pcm_samples(wav.as_bytes());
    assert_eq!(samples.len(), 40000);
    assert!(samples[..16000].iter().all(|&s| s == 16383));
    assert!(samples[16000..24000].iter().all(|&s| s == 0));
    assert!(samples[24000..].iter().all(|&s| s == 16383));
}

#[tokio::test]
async fn test_merged_buffer_frames() {
    let synth = StubSynthesizer::new();
    let segments = vec![Segment::new("Hello"), Segment::new("World")];

    let merged = BatchGenerator::new(BatchConfig::default())
        .generate_buffer(&synth, &segments)
        .await
        .unwrap();

    assert_eq!(merged.frame_count(), 16000 + 8000 + 16000);
    assert_eq!(merged.channel_count(), 1);
    assert_eq!(merged.sample_rate(), 16000);
    assert!(merged.channel(0)[16000..24000].iter().all(|&s| s == 0.0));
    assert!(merged.channel(0)[24000..].iter().all(|&s| s == 0.5));
}

#[tokio::test]
async fn test_requests_in_order_with_warmup_and_voices() {
    let synth = StubSynthesizer::new();
    let config = BatchConfig {
        default_voice: Some("narrator".to_string()),
        params: GenerationParams {
            exaggeration: 1.0,
            cfg_weight: 0.3,
            temperature: 0.6,
        },
        ..BatchConfig::default()
    };
    let segments = vec![
        Segment::new("First").with_voice("alice"),
        Segment::new("   "),
        Segment::new("Second"),
        Segment::new("Third").with_voice("bob"),
    ];

    BatchGenerator::new(config.clone())
        .generate(&synth, &segments)
        .await
        .unwrap();

    let requests = synth.requests();
    let texts: Vec<&str> = requests.iter().map(|r| r.text.as_str()).collect();
    assert_eq!(texts, vec![config.warmup_text.as_str(), "First", "Second", "Third"]);

    let voices: Vec<Option<&str>> = requests.iter().map(|r| r.voice.as_deref()).collect();
    assert_eq!(
        voices,
        vec![Some("narrator"), Some("alice"), Some("narrator"), Some("bob")]
    );
    assert!(requests.iter().all(|r| r.params == config.params));
}

#[tokio::test]
async fn test_failed_segment_aborts_batch() {
    let synth = StubSynthesizer::new().failing_on("World");
    let segments = vec![
        Segment::new("Hello"),
        Segment::new("World"),
        Segment::new("Again"),
    ];

    let result = BatchGenerator::new(BatchConfig::default())
        .generate(&synth, &segments)
        .await;

    match result {
        Err(TtsMergeError::Segment { index, source }) => {
            assert_eq!(index, 1);
            assert!(matches!(*source, TtsMergeError::Synthesis(_)));
        }
        other => panic!("expected a segment failure, got {:?}", other.map(|w| w.len())),
    }

    // Последний сегмент не запрашивается
    let texts: Vec<String> = synth.requests().into_iter().map(|r| r.text).collect();
    assert!(!texts.contains(&"Again".to_string()));
}

#[tokio::test]
async fn test_undecodable_clip_aborts_batch() {
    let synth = StubSynthesizer::new().garbage_on("Broken");
    let segments = vec![Segment::new("Fine"), Segment::new("Broken")];

    let result = BatchGenerator::new(BatchConfig::default())
        .generate(&synth, &segments)
        .await;

    assert!(matches!(
        result,
        Err(TtsMergeError::Segment { index: 1, ref source }) if matches!(**source, TtsMergeError::Decode(_))
    ));
}

#[test]
fn test_warmup_failure_is_swallowed() {
    let config = BatchConfig::default();
    let synth = StubSynthesizer::new().failing_on(&config.warmup_text);
    let segments = vec![Segment::new("Hello")];

    let wav = tokio_test::block_on(BatchGenerator::new(config).generate(&synth, &segments)).unwrap();

    assert_eq!(wav.len(), 44 + 16000 * 2);
    assert_eq!(synth.requests().len(), 2);
}

#[tokio::test]
async fn test_warmup_disabled() {
    let synth = StubSynthesizer::new();
    let config = BatchConfig {
        warmup: false,
        ..BatchConfig::default()
    };

    BatchGenerator::new(config)
        .generate(&synth, &[Segment::new("Only")])
        .await
        .unwrap();

    let requests = synth.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].text, "Only");
}

#[tokio::test]
async fn test_no_segments() {
    let synth = StubSynthesizer::new();
    let segments = vec![Segment::new(""), Segment::new(" \t ")];

    let result = BatchGenerator::new(BatchConfig::default())
        .generate(&synth, &segments)
        .await;

    assert!(matches!(result, Err(TtsMergeError::NoSegments)));
    assert!(synth.requests().is_empty());

    let result = BatchGenerator::new(BatchConfig::default())
        .generate(&synth, &[])
        .await;
    assert!(matches!(result, Err(TtsMergeError::NoSegments)));
}

#[tokio::test]
async fn test_invalid_params_rejected_before_requests() {
    let synth = StubSynthesizer::new();
    let config = BatchConfig {
        params: GenerationParams {
            exaggeration: 9.0,
            ..GenerationParams::default()
        },
        ..BatchConfig::default()
    };

    let result = BatchGenerator::new(config)
        .generate(&synth, &[Segment::new("Hello")])
        .await;

    assert!(matches!(result, Err(TtsMergeError::Configuration(_))));
    assert!(synth.requests().is_empty());
}

#[tokio::test]
async fn test_progress_updates() {
    let synth = StubSynthesizer::new();
    let (tx, mut rx) = mpsc::channel(64);

    BatchGenerator::new(BatchConfig::default())
        .with_progress_sender(tx)
        .generate(&synth, &[Segment::new("A"), Segment::new("B")])
        .await
        .unwrap();

    let mut updates = Vec::new();
    while let Some(update) = rx.recv().await {
        updates.push(update);
    }

    assert_eq!(
        updates,
        vec![
            ProgressUpdate::Started { total: 2 },
            ProgressUpdate::WarmingUp,
            ProgressUpdate::Synthesizing { current: 1, total: 2 },
            ProgressUpdate::Decoding { current: 1, total: 2 },
            ProgressUpdate::Synthesizing { current: 2, total: 2 },
            ProgressUpdate::Decoding { current: 2, total: 2 },
            ProgressUpdate::Merging,
            ProgressUpdate::Encoding,
            ProgressUpdate::Finished,
        ]
    );
}

#[tokio::test]
async fn test_convenience_api() {
    let synth = StubSynthesizer::new();

    let wav = crate::generate_batch(
        &[Segment::new("Hello"), Segment::new("World").with_voice("bob")],
        GenerationParams::default(),
        Some("narrator"),
        &synth,
    )
    .await
    .unwrap();

    assert_eq!(wav.len(), 44 + 40000 * 2);

    let voices: Vec<Option<String>> = synth.requests().into_iter().map(|r| r.voice).collect();
    assert_eq!(
        voices,
        vec![
            Some("narrator".to_string()),
            Some("narrator".to_string()),
            Some("bob".to_string())
        ]
    );
}

#[tokio::test]
async fn test_convenience_api_without_default_voice() {
    let synth = StubSynthesizer::new();

    crate::generate_batch(&[Segment::new("Hello")], GenerationParams::default(), None, &synth)
        .await
        .unwrap();

    assert!(synth.requests().iter().all(|r| r.voice.is_none()));
}

#[tokio::test]
async fn test_oversized_gap_fails_cleanly() {
    let synth = StubSynthesizer::new();
    let config = BatchConfig {
        gap_seconds: 1e30,
        warmup: false,
        ..BatchConfig::default()
    };

    let result = BatchGenerator::new(config)
        .generate(&synth, &[Segment::new("A"), Segment::new("B")])
        .await;

    assert!(matches!(result, Err(TtsMergeError::Configuration(_))));
}
