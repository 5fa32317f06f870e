mod app;

use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use app::App;
use frenzytone::audio::{export_wav, DeviceOutput, RenderPlan};
use frenzytone::engine::{SoundEngine, Track};
use frenzytone::prefs::{FileBackend, PreferenceStore};
use frenzytone::sequencer::PatternLibrary;
use frenzytone::ui::Theme;

/// Frenzytone - adaptive game soundtrack playground
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Theme to use for the interface
    #[arg(long, default_value = "default")]
    theme: String,

    /// List available themes and exit
    #[arg(long)]
    list_themes: bool,

    /// Pattern catalog (JSON array) to use instead of the built-in one
    #[arg(long)]
    patterns: Option<PathBuf>,

    /// Directory holding preferences.json (default ~/.frenzytone)
    #[arg(long)]
    prefs_dir: Option<PathBuf>,

    /// Render the gameplay track to a WAV file instead of opening the playground
    #[arg(long)]
    render: Option<PathBuf>,

    /// Track to render: gameplay or menu
    #[arg(long, default_value = "gameplay")]
    track: String,

    /// Length of the offline render in seconds
    #[arg(long, default_value_t = 30.0)]
    seconds: f32,

    /// Starting difficulty
    #[arg(long, default_value_t = 1.0)]
    difficulty: f32,

    /// Difficulty reached at the end of an offline render
    #[arg(long)]
    ramp_to: Option<f32>,

    /// Score gained per second during an offline render
    #[arg(long, default_value_t = 0.0)]
    score_rate: f32,

    /// Seed for pattern selection and the autopilot
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.list_themes {
        println!("Available themes:");
        for theme in Theme::available_themes() {
            println!("  {}", theme);
        }
        return Ok(());
    }

    let library = match &args.patterns {
        Some(path) => PatternLibrary::load(path)
            .with_context(|| format!("Failed to load patterns from {}", path.display()))?,
        None => PatternLibrary::builtin(),
    };

    if let Some(path) = &args.render {
        init_logging(None)?;
        let plan = RenderPlan {
            track: Track::from_name(&args.track),
            seconds: args.seconds,
            start_difficulty: args.difficulty,
            end_difficulty: args.ramp_to.unwrap_or(args.difficulty),
            score_rate: args.score_rate,
            seed: args.seed,
            library,
        };
        let result = export_wav(plan, path)?;
        println!(
            "Rendered {:.1}s ({} samples) to {}, final tempo {:.0} BPM",
            result.duration_secs,
            result.samples,
            path.display(),
            result.final_tempo
        );
        return Ok(());
    }

    let backend = match &args.prefs_dir {
        Some(dir) => FileBackend::in_dir(dir),
        None => FileBackend::default_location(),
    };
    let log_dir = backend
        .path()
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    init_logging(Some(log_dir))?;

    let theme = Theme::from_name(&args.theme).unwrap_or_else(|| {
        tracing::warn!(
            "Unknown theme '{}', using default. Use --list-themes to see available themes.",
            args.theme
        );
        Theme::default()
    });

    let mut engine = SoundEngine::new(DeviceOutput::open, PreferenceStore::new(backend))
        .with_library(library);
    if let Some(seed) = args.seed {
        engine = engine.with_seed(seed);
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let mut app = App::new(theme, engine, args.difficulty, seed);
    app.run()
}

/// Log to stderr, or to `frenzytone.log` in `dir` while the terminal UI owns the screen
fn init_logging(dir: Option<PathBuf>) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    match dir {
        Some(dir) => {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            let path = dir.join("frenzytone.log");
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
    Ok(())
}
