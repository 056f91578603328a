use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use gifcast::{
    ConflictPolicy, ConversionOutcome, ConversionReport, Converter, FfmpegLogLevel, FrameSource,
    OutputTarget, ProcessingConfig, ProcessingOrder, ProgressCallback, ProgressInfo, Settings,
    Stage, TimingStats, VideoFile, default_output_path, format_duration, resolve_output,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  gifcast convert clip.mp4\n  gifcast convert clip.mp4 --out loop.gif --frame-step 2 --scale 0.4\n  gifcast convert clip.mp4 --vector-quantization --vector-colors 32 --order quality\n  gifcast convert clip.mp4 --settings gifcast.json --on-conflict rename --progress\n  gifcast probe clip.mp4 --json\n  gifcast completions zsh > _gifcast";

#[derive(Debug, Parser)]
#[command(
    name = "gifcast",
    version,
    about = "Turn video clips into small looping GIFs",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show debug logging output.
    #[arg(long, global = true)]
    verbose: bool,

    /// Show a progress bar while frames are decoded.
    #[arg(long, global = true)]
    progress: bool,

    /// FFmpeg log level (quiet, fatal, error, warning, info, verbose, debug).
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Convert a video into a looping GIF.
    #[command(
        about = "Convert a video into a looping GIF",
        after_help = "Flags override values from --settings, which override the defaults."
    )]
    Convert(ConvertArgs),

    /// Print video stream properties.
    #[command(
        about = "Print video properties",
        visible_alias = "info",
        after_help = "Examples:\n  gifcast probe input.mp4\n  gifcast probe input.mp4 --json"
    )]
    Probe {
        /// Input video path.
        input: PathBuf,

        /// Output as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Generate shell completion scripts.
    #[command(about = "Generate shell completions")]
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args, Clone, Default)]
struct ConvertArgs {
    /// Input video path.
    input: PathBuf,

    /// Output GIF path (default: next to the input, same name, .gif).
    #[arg(long)]
    out: Option<PathBuf>,

    /// What to do if the output exists: cancel, replace or rename.
    #[arg(long, default_value = "cancel")]
    on_conflict: String,

    /// Shorthand for `--on-conflict replace`.
    #[arg(long)]
    overwrite: bool,

    /// JSON settings file.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Keep every Nth frame.
    #[arg(long)]
    frame_step: Option<u32>,

    /// Resampling ratio (0.5 = half size).
    #[arg(long)]
    scale: Option<f64>,

    /// Use the fast fixed 32-color palette.
    #[arg(long)]
    color_optim: bool,

    /// Cluster colors with k-means instead of building a palette.
    #[arg(long)]
    vector_quantization: bool,

    /// Number of k-means clusters.
    #[arg(long)]
    vector_colors: Option<u16>,

    /// Keep frames by motion instead of a fixed stride.
    #[arg(long)]
    dynamic_framerate: bool,

    /// Minimum motion score for a frame to be kept.
    #[arg(long)]
    motion_threshold: Option<f64>,

    /// Stage order: efficiency or quality.
    #[arg(long)]
    order: Option<String>,

    /// Do not report per-stage timing.
    #[arg(long)]
    no_time_logging: bool,

    /// Output the conversion report as JSON.
    #[arg(long)]
    json: bool,
}

fn parse_conflict_policy(value: &str, overwrite: bool) -> Option<ConflictPolicy> {
    if overwrite {
        return Some(ConflictPolicy::Replace);
    }
    value.parse().ok()
}

fn parse_log_level(value: &str) -> Option<FfmpegLogLevel> {
    value.parse().ok()
}

/// Layer command-line flags over the settings file (or the defaults).
fn build_settings(args: &ConvertArgs) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = match &args.settings {
        Some(path) => Settings::from_json_file(path)?,
        None => Settings::default(),
    };

    if let Some(step) = args.frame_step {
        settings.frame_step = step;
    }
    if let Some(scale) = args.scale {
        settings.scale_factor = scale;
    }
    if let Some(colors) = args.vector_colors {
        settings.vector_colors = colors;
    }
    if let Some(threshold) = args.motion_threshold {
        settings.motion_threshold = threshold;
    }
    if let Some(order) = &args.order {
        settings.processing_order = order.parse::<ProcessingOrder>()?;
    }
    settings.color_optim |= args.color_optim;
    settings.vector_quantization |= args.vector_quantization;
    settings.dynamic_framerate |= args.dynamic_framerate;
    if args.no_time_logging {
        settings.time_logging = false;
    }

    Ok(settings)
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    // A second call (e.g. from tests) leaves the first subscriber in place.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    init_logging(global.verbose);

    let level = match &global.log_level {
        Some(level) => {
            parse_log_level(level).ok_or(format!("unsupported --log-level: {level}"))?
        }
        None => FfmpegLogLevel::for_verbosity(global.verbose),
    };
    gifcast::set_ffmpeg_log_level(level);
    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style = ProgressStyle::with_template(
            "{spinner:.green} {bar:40.cyan/blue} {pos}/{len} frames ({eta}) {msg}",
        )?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        if let Some(total) = info.total_frames {
            self.bar.set_length(total.max(info.frames_read));
        }
        self.bar.set_position(info.frames_read);
        self.bar.set_message(format!("{} kept", info.frames_admitted));
    }
}

fn resolve_target(args: &ConvertArgs) -> Result<OutputTarget, Box<dyn std::error::Error>> {
    let policy = parse_conflict_policy(&args.on_conflict, args.overwrite)
        .ok_or(format!("unsupported --on-conflict: {}", args.on_conflict))?;
    let path = args
        .out
        .clone()
        .unwrap_or_else(|| default_output_path(&args.input));

    let target = resolve_output(&path, policy);
    if policy == ConflictPolicy::Replace && path.exists() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            format!("overwriting {}", path.display()).yellow()
        );
    }
    Ok(target)
}

fn timing_json(stats: &TimingStats) -> serde_json::Value {
    let stages: serde_json::Map<String, serde_json::Value> = Stage::ALL
        .into_iter()
        .map(|stage| {
            (
                stage.label().to_string(),
                json!({
                    "seconds": stats.stage(stage).as_secs_f64(),
                    "percent": stats.percentage(stage),
                }),
            )
        })
        .collect();
    json!({
        "total_seconds": stats.total().as_secs_f64(),
        "frames_read": stats.frames_read,
        "frames_admitted": stats.frames_admitted,
        "clustered_pixels": stats.clustered_pixels,
        "throughput_fps": stats.throughput(),
        "stages": stages,
    })
}

fn print_report(report: &ConversionReport, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if as_json {
        let payload = json!({
            "output": report.output_path.display().to_string(),
            "frames": report.frame_count,
            "frame_duration_ms": report.frame_duration_ms,
            "width": report.width,
            "height": report.height,
            "timing": report.timing.as_ref().map(timing_json),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "wrote {} frame(s) at {}x{}, {} ms/frame to {}",
            report.frame_count,
            report.width,
            report.height,
            report.frame_duration_ms,
            report.output_path.display()
        )
        .green()
    );
    if let Some(timing) = &report.timing {
        eprintln!("{}", "timing".cyan().bold());
        eprintln!("{}", timing.report());
    }
    Ok(())
}

fn convert(args: &ConvertArgs, global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let settings = build_settings(args)?;
    let config = ProcessingConfig::try_from(settings)?;
    log::debug!("{config:?}");

    // Configuration problems surface before the output is resolved.
    let mut converter = Converter::new(config)?;

    let target = resolve_target(args)?;
    let OutputTarget::Path(output_path) = &target else {
        eprintln!(
            "{} {}",
            "cancelled:".yellow().bold(),
            "output already exists (use --on-conflict replace|rename or --overwrite)".yellow()
        );
        return Ok(());
    };
    log::info!(
        "Converting {} -> {}",
        args.input.display(),
        output_path.display()
    );

    let progress = if global.progress {
        let progress = Arc::new(TerminalProgress::new()?);
        converter = converter.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    let outcome = converter.convert(&args.input, target.clone());
    if let Some(progress) = &progress {
        progress.bar.finish_and_clear();
    }

    match outcome? {
        ConversionOutcome::Completed(report) => print_report(&report, args.json),
        ConversionOutcome::Cancelled => Ok(()),
    }
}

fn probe(input: &Path, as_json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let source = VideoFile::open(input)?;
    let info = source.info();
    if as_json {
        let payload = json!({
            "path": info.path.display().to_string(),
            "width": info.width,
            "height": info.height,
            "fps": info.frames_per_second,
            "frame_count": info.frame_count,
            "duration_seconds": info.duration.as_secs_f64(),
            "codec": info.codec,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("File: {}", info.path.display());
        println!(
            "Video: {}x{} @ {:.2} fps [{}]",
            info.width, info.height, info.frames_per_second, info.codec
        );
        println!("Frames: {}", info.frame_count);
        println!("Duration: {}", format_duration(info.duration));
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    match &cli.command {
        Commands::Convert(args) => convert(args, &cli.global)?,
        Commands::Probe { input, json } => probe(input, *json)?,
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(*shell, &mut command, "gifcast", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gifcast::{ColorStrategy, FrameAdmissionPolicy, PaletteMode};

    fn args(input: &str) -> ConvertArgs {
        ConvertArgs {
            input: PathBuf::from(input),
            on_conflict: "cancel".to_string(),
            ..ConvertArgs::default()
        }
    }

    #[test]
    fn parse_conflict_policy_aliases() {
        assert_eq!(parse_conflict_policy("rename", false), Some(ConflictPolicy::Rename));
        assert_eq!(parse_conflict_policy("REPLACE", false), Some(ConflictPolicy::Replace));
        assert_eq!(parse_conflict_policy("cancel", true), Some(ConflictPolicy::Replace));
        assert_eq!(parse_conflict_policy("prompt", false), None);
    }

    #[test]
    fn parse_log_level_aliases() {
        assert_eq!(parse_log_level("warn"), Some(FfmpegLogLevel::Warning));
        assert_eq!(parse_log_level("quiet"), Some(FfmpegLogLevel::Quiet));
        assert!(parse_log_level("loud").is_none());
    }

    #[test]
    fn defaults_match_settings_defaults() {
        let settings = build_settings(&args("clip.mp4")).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn flags_override_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("settings.json");
        std::fs::write(&file, r#"{ "frame_step": 4, "scale_factor": 0.25, "color_optim": true }"#)
            .unwrap();

        let mut convert = args("clip.mp4");
        convert.settings = Some(file);
        convert.frame_step = Some(2);
        convert.order = Some("quality".to_string());

        let config = ProcessingConfig::try_from(build_settings(&convert).unwrap()).unwrap();
        assert_eq!(config.admission, FrameAdmissionPolicy::FixedStride { step: 2 });
        assert_eq!(config.scale_factor, 0.25);
        assert_eq!(config.color, ColorStrategy::Palette(PaletteMode::Fast));
        assert_eq!(config.order, ProcessingOrder::Quality);
    }

    #[test]
    fn bad_order_is_reported() {
        let mut convert = args("clip.mp4");
        convert.order = Some("fastest".to_string());
        assert!(build_settings(&convert).is_err());
    }

    #[test]
    fn cli_parses_convert_flags() {
        let cli = Cli::try_parse_from([
            "gifcast",
            "convert",
            "in.mp4",
            "--dynamic-framerate",
            "--motion-threshold",
            "25",
            "--no-time-logging",
            "--verbose",
        ])
        .unwrap();
        assert!(cli.global.verbose);
        let Commands::Convert(convert) = cli.command else {
            panic!("expected convert");
        };
        let settings = build_settings(&convert).unwrap();
        assert!(settings.dynamic_framerate);
        assert_eq!(settings.motion_threshold, 25.0);
        assert!(!settings.time_logging);
    }
}
