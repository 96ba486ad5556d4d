use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{error, info};
use tokio::sync::mpsc;

use tts_merge::config::AppConfig;
use tts_merge::script;
use tts_merge::session::SessionState;
use tts_merge::tts::{BatchGenerator, HttpSynthesizer, ProgressUpdate};
use tts_merge::utils::logger::init_logger;

/// Synthesize a multi-speaker script and merge it into one WAV file
#[derive(Parser, Debug)]
#[command(
    name = "tts-merge",
    version,
    about,
    after_help = "Settings are applied in this order, later ones win:\n  \
        1. built-in defaults\n  \
        2. --config file\n  \
        3. TTS_BASE_URL, TTS_API_KEY, TTS_MODEL, TTS_TIMEOUT_SECS\n  \
        4. params stored in an existing --session file\n  \
        5. command-line flags"
)]
struct Args {
    /// Script file: one segment per line, `[speaker] text` assigns a speaker
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, default_value = "output.wav")]
    output: PathBuf,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// TTS server base URL, overrides TTS_BASE_URL
    #[arg(long)]
    base_url: Option<String>,

    /// Voice for a speaker, as SPEAKER=VOICE (repeatable)
    #[arg(long = "voice", value_name = "SPEAKER=VOICE")]
    voices: Vec<String>,

    /// Voice for speakers without an assignment
    #[arg(long)]
    default_voice: Option<String>,

    #[arg(long)]
    exaggeration: Option<f32>,

    #[arg(long)]
    cfg_weight: Option<f32>,

    #[arg(long)]
    temperature: Option<f32>,

    /// Silence between segments, in seconds
    #[arg(long)]
    gap_seconds: Option<f32>,

    /// Skip the warm-up request
    #[arg(long)]
    no_warmup: bool,

    /// Session file: script, voices and params are read from it and the
    /// merged audio is stored back. A new session starts from the
    /// configured params
    #[arg(long)]
    session: Option<PathBuf>,
}

fn parse_voice_assignment(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((speaker, voice)) if !speaker.trim().is_empty() && !voice.trim().is_empty() => {
            Ok((speaker.trim().to_string(), voice.trim().to_string()))
        }
        _ => bail!("invalid voice assignment '{}', expected SPEAKER=VOICE", raw),
    }
}

fn describe(update: &ProgressUpdate) -> String {
    match update {
        ProgressUpdate::Started { total } => format!("starting {} segments", total),
        ProgressUpdate::WarmingUp => "warming up".to_string(),
        ProgressUpdate::Synthesizing { current, total } => {
            format!("synthesizing {}/{}", current, total)
        }
        ProgressUpdate::Decoding { current, total } => format!("decoding {}/{}", current, total),
        ProgressUpdate::Merging => "merging clips".to_string(),
        ProgressUpdate::Encoding => "encoding WAV".to_string(),
        ProgressUpdate::Finished => "done".to_string(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AppConfig::default(),
    };
    config.client.apply_env()?;
    if let Some(url) = args.base_url.clone() {
        config.client.base_url = url;
    }

    let mut session = match &args.session {
        Some(path) => SessionState::load_or(path, config.batch.params)
            .with_context(|| format!("loading session {}", path.display()))?,
        None => SessionState {
            params: config.batch.params,
            ..SessionState::default()
        },
    };

    if let Some(path) = &args.script {
        session.lines = script::parse_script_file(path)?;
    }
    if session.lines.is_empty() {
        bail!("no script lines: pass --script or a session with lines");
    }

    let assignments: BTreeMap<String, String> = args
        .voices
        .iter()
        .map(|raw| parse_voice_assignment(raw))
        .collect::<Result<_>>()?;
    session.voice_assignments.extend(assignments);

    if let Some(value) = args.exaggeration {
        session.params.exaggeration = value;
    }
    if let Some(value) = args.cfg_weight {
        session.params.cfg_weight = value;
    }
    if let Some(value) = args.temperature {
        session.params.temperature = value;
    }

    let mut batch = config.batch.clone();
    batch.params = session.params;
    if let Some(voice) = args.default_voice.clone() {
        batch.default_voice = Some(voice);
    }
    if let Some(gap) = args.gap_seconds {
        batch.gap_seconds = gap;
    }
    if args.no_warmup {
        batch.warmup = false;
    }

    let speakers = script::speakers(&session.lines);
    for speaker in &speakers {
        match session.voice_assignments.get(speaker) {
            Some(voice) => info!("Speaker '{}' -> voice '{}'", speaker, voice),
            None => info!("Speaker '{}' -> default voice", speaker),
        }
    }
    let segments = session.segments();

    let synthesizer = HttpSynthesizer::new(config.client.clone())?;

    let (tx, mut rx) = mpsc::channel::<ProgressUpdate>(32);
    let progress_task = tokio::spawn(async move {
        while let Some(update) = rx.recv().await {
            info!("Progress: {}", describe(&update));
        }
    });

    let generator = BatchGenerator::new(batch).with_progress_sender(tx);
    let result = generator.generate(&synthesizer, &segments).await;
    drop(generator);
    let _ = progress_task.await;

    let wav = match result {
        Ok(wav) => wav,
        Err(e) => {
            error!("Generation failed: {}", e);
            return Err(e.into());
        }
    };

    wav.write_to(&args.output)
        .with_context(|| format!("writing {}", args.output.display()))?;

    if let Some(path) = &args.session {
        session.set_merged_audio(&wav);
        session.save(path)?;
    }

    info!(
        "Wrote {} ({} lines, {} speakers)",
        args.output.display(),
        session.lines.len(),
        speakers.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_voice_assignment() {
        assert_eq!(
            parse_voice_assignment("alice = voice-a").unwrap(),
            ("alice".to_string(), "voice-a".to_string())
        );
        assert!(parse_voice_assignment("alice").is_err());
        assert!(parse_voice_assignment("=voice").is_err());
    }

    #[test]
    fn test_cli_definition() {
        use clap::CommandFactory;
        Args::command().debug_assert();

        let args = Args::try_parse_from(["tts-merge", "--session", "s.json"]).unwrap();
        assert_eq!(args.base_url, None);
        assert_eq!(args.exaggeration, None);
        assert!(!args.no_warmup);
    }
}
