//! `hushtrim` — detect silence in a WAV file and print suggested trim points.

mod settings;
mod wav;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use hushtrim_core::{
    optimal_trim_points, ClassifierHandle, DetectionOptions, DetectionResult, DetectionStrategy,
    HushtrimError, SilenceDetector, ThresholdPreset, TrimPoints,
};
use serde::Serialize;
use tracing::info;

use settings::{default_settings_path, load_settings, save_settings, CliSettings};

const USAGE: &str = "Usage: hushtrim <input.wav> [--strategy energy|background|classifier] \\
  [--preset quiet|default|moderate] [--threshold-db <dB>] [--min-duration-ms <ms>] \\
  [--window-ms <ms>] [--settings <file.json>] [--save-settings] [--output <file.json>]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    input: PathBuf,
    strategy: Option<DetectionStrategy>,
    preset: Option<ThresholdPreset>,
    threshold_db: Option<f64>,
    min_duration_ms: Option<f64>,
    window_ms: Option<f64>,
    settings: Option<PathBuf>,
    save_settings: bool,
    output: Option<PathBuf>,
}

impl Args {
    /// Layer command-line overrides on top of persisted settings.
    ///
    /// Values from the settings file were already repaired by
    /// [`load_settings`]; values typed on the command line are checked as-is.
    fn apply_to(&self, settings: &mut CliSettings) -> Result<(), HushtrimError> {
        if let Some(strategy) = self.strategy {
            settings.strategy = strategy;
        }
        if let Some(preset) = self.preset {
            settings.preset = preset;
            settings.threshold_db = None;
        }
        if let Some(db) = self.threshold_db {
            settings.threshold_db = Some(db);
        }
        if let Some(ms) = self.min_duration_ms {
            settings.min_duration_ms = ms;
        }
        if let Some(ms) = self.window_ms {
            settings.window_size_ms = ms;
        }
        settings.detection_options().validate()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    file: String,
    duration_secs: f64,
    sample_rate: u32,
    channels: usize,
    strategy: DetectionStrategy,
    options: DetectionOptions,
    total_silence_secs: f64,
    trim: TrimPoints,
    result: DetectionResult,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Option<Args>> {
    fn number(flag: &str, value: Option<String>) -> Result<f64> {
        let Some(v) = value else {
            bail!("missing value for {flag}");
        };
        v.parse::<f64>()
            .with_context(|| format!("invalid value for {flag}: {v}"))
    }

    let mut parsed = Args::default();
    let mut input = None;
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--strategy" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --strategy");
                };
                parsed.strategy = Some(v.parse()?);
            }
            "--preset" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --preset");
                };
                parsed.preset = Some(v.parse()?);
            }
            "--threshold-db" => parsed.threshold_db = Some(number(&arg, it.next())?),
            "--min-duration-ms" => parsed.min_duration_ms = Some(number(&arg, it.next())?),
            "--window-ms" => parsed.window_ms = Some(number(&arg, it.next())?),
            "--settings" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --settings");
                };
                parsed.settings = Some(PathBuf::from(v));
            }
            "--save-settings" => parsed.save_settings = true,
            "--output" => {
                let Some(v) = it.next() else {
                    bail!("missing value for --output");
                };
                parsed.output = Some(PathBuf::from(v));
            }
            "--help" | "-h" => return Ok(None),
            other if other.starts_with("--") => bail!("unknown argument: {other}"),
            other => {
                if input.is_some() {
                    bail!("unexpected extra input: {other}");
                }
                input = Some(PathBuf::from(other));
            }
        }
    }

    let Some(input) = input else {
        bail!("missing input file\n{USAGE}");
    };
    parsed.input = input;
    Ok(Some(parsed))
}

#[cfg(feature = "onnx")]
fn build_classifier(settings: &CliSettings) -> Result<ClassifierHandle> {
    use hushtrim_core::SileroClassifier;

    let path = settings
        .silero_model_path
        .clone()
        .unwrap_or_else(SileroClassifier::default_model_path);
    let classifier = SileroClassifier::new(&path, settings.silero_threshold)
        .with_context(|| format!("failed to load Silero model from {}", path.display()))?;
    Ok(ClassifierHandle::new(classifier))
}

#[cfg(not(feature = "onnx"))]
fn build_classifier(_settings: &CliSettings) -> Result<ClassifierHandle> {
    bail!("the classifier strategy requires hushtrim built with the 'onnx' feature")
}

async fn run(args: Args) -> Result<()> {
    let settings_path = args.settings.clone().unwrap_or_else(default_settings_path);
    let mut settings = load_settings(&settings_path);
    args.apply_to(&mut settings)?;

    if args.save_settings {
        save_settings(&settings_path, &settings)
            .with_context(|| format!("failed to save {}", settings_path.display()))?;
        info!(path = %settings_path.display(), "settings saved");
    }

    let buffer = wav::read_wav(&args.input)?;
    let options = settings.detection_options();
    options.window_size_samples(buffer.sample_rate())?;

    let classifier = match settings.strategy {
        DetectionStrategy::Classifier => Some(build_classifier(&settings)?),
        _ => None,
    };
    let detector = SilenceDetector::from_strategy(settings.strategy, classifier)?;

    info!(
        file = %args.input.display(),
        strategy = settings.strategy.as_str(),
        threshold_db = options.threshold_db,
        min_duration_ms = options.min_duration_ms,
        window_size_ms = options.window_size_ms,
        "detecting silence"
    );

    let result = detector.detect(&buffer, &options).await?;
    let duration = buffer.duration_secs();
    let trim = optimal_trim_points(&result, duration);

    info!(
        regions = result.silences.len(),
        trim_start = trim.start,
        trim_end = trim.end,
        "detection finished"
    );

    let report = Report {
        file: args.input.display().to_string(),
        duration_secs: duration,
        sample_rate: buffer.sample_rate(),
        channels: buffer.channel_count(),
        strategy: settings.strategy,
        options,
        total_silence_secs: result.total_silence_duration(),
        trim,
        result,
    };
    let json = serde_json::to_string_pretty(&report)?;

    match &args.output {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("hushtrim=info")),
        )
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(Some(args)) => args,
        Ok(None) => {
            println!("{USAGE}");
            return;
        }
        Err(e) => {
            eprintln!("hushtrim: {e:#}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args).await {
        eprintln!("hushtrim failed: {e:#}");
        std::process::exit(exit_code(&e));
    }
}

/// 2 for unusable detection options (like a bad flag), 1 for everything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<HushtrimError>() {
        Some(HushtrimError::InvalidConfig(_)) => 2,
        _ => 1,
    }
}
