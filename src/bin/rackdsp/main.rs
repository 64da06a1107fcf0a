//! rackdsp - render a single note through an instrument and effect chain
//!
//! Run with: cargo run -- render out.wav --instrument unison -e distenv

mod playback;
mod render;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, Result as EyreResult, WrapErr};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rackdsp::effect::chain::DEFAULT_CAPACITY;
use rackdsp::effect::{effect_chain, BaseParams, DistEnv, Effect, Noyzr, NoyzrControls};
use rackdsp::instrument::{FbSynth, FbSynthParams, UnisonOscillator, UnisonParams};
use rackdsp::params::{Settings, SettingsNode};
use rackdsp::{EngineConfig, EngineContext, Frame};

use render::{render_note, NoteTiming, RenderStats};

#[derive(Parser)]
#[command(name = "rackdsp")]
#[command(about = "Render notes through rackdsp instruments and effects", long_about = None)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render a note to a 32-bit float stereo WAV file
    Render {
        /// Output WAV file path
        output: PathBuf,

        /// Sample rate in Hz
        #[arg(short, long, default_value = "44100")]
        sample_rate: u32,

        #[command(flatten)]
        note: NoteArgs,
    },

    /// Render a note at the output device's rate and play it
    Play {
        #[command(flatten)]
        note: NoteArgs,
    },
}

#[derive(Args)]
struct NoteArgs {
    #[arg(short, long, value_enum, default_value_t = InstrumentKind::Fbsynth)]
    instrument: InstrumentKind,

    /// Effects in processing order (repeatable)
    #[arg(short = 'e', long = "effect", value_enum)]
    effects: Vec<EffectKind>,

    /// Note frequency in Hz
    #[arg(short, long, default_value = "110.0")]
    frequency: f32,

    /// Total length in seconds
    #[arg(short, long, default_value = "2.0")]
    duration: f32,

    /// Seconds until the key goes up (default: half the duration)
    #[arg(short, long)]
    release: Option<f32>,

    /// Frames per processing period
    #[arg(short, long, default_value = "256")]
    period: usize,

    /// JSON settings: instrument keys at the top level, each effect under
    /// a child object named after it ("DistEnv", "Noyzr")
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Seed for noise and unison randomization
    #[arg(long, default_value = "24301")]
    seed: u64,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum InstrumentKind {
    Fbsynth,
    Unison,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EffectKind {
    Distenv,
    Noyzr,
}

impl EffectKind {
    fn build(self, seed: u64) -> Box<dyn Effect> {
        match self {
            EffectKind::Distenv => Box::new(DistEnv::default()),
            EffectKind::Noyzr => Box::new(Noyzr::new(
                BaseParams::default(),
                NoyzrControls::default(),
                seed,
            )),
        }
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_settings(path: Option<&PathBuf>) -> EyreResult<Option<SettingsNode>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read settings from {}", path.display()))?;
    let node = SettingsNode::from_json(&text)
        .wrap_err_with(|| format!("failed to parse settings in {}", path.display()))?;
    info!(path = %path.display(), keys = node.len(), "settings loaded");
    Ok(Some(node))
}

fn render(args: &NoteArgs, sample_rate: u32) -> EyreResult<Vec<Frame>> {
    if args.duration.is_nan() || args.duration <= 0.0 {
        bail!("duration must be positive, got {}", args.duration);
    }

    let ctx = EngineContext::new(EngineConfig {
        sample_rate: sample_rate as f32,
        frames_per_period: args.period,
    })?;
    let settings = load_settings(args.settings.as_ref())?;

    let (mut handle, mut chain) = effect_chain(DEFAULT_CAPACITY);
    for (i, kind) in args.effects.iter().enumerate() {
        let effect = kind.build(args.seed.wrapping_add(i as u64 + 1));
        if let Some(child) = settings.as_ref().and_then(|s| s.child(effect.name())) {
            effect.load_settings(&child);
        }
        handle.append(effect)?;
    }

    let sr = sample_rate as f32;
    let release = args.release.unwrap_or(args.duration * 0.5);
    let timing = NoteTiming {
        frequency: args.frequency,
        total_frames: (args.duration * sr) as usize,
        release_frame: (release.max(0.0) * sr) as usize,
    };

    info!(
        instrument = ?args.instrument,
        effects = handle.len(),
        frequency = args.frequency,
        frames = timing.total_frames,
        "rendering"
    );

    let frames = match args.instrument {
        InstrumentKind::Fbsynth => {
            let mut synth = FbSynth::with_seed(FbSynthParams::default(), args.seed);
            if let Some(node) = &settings {
                synth.load_settings(node);
            }
            render_note(&ctx, &mut synth, &mut chain, timing)
        }
        InstrumentKind::Unison => {
            let mut osc = UnisonOscillator::with_seed(UnisonParams::default(), args.seed);
            if let Some(node) = &settings {
                osc.load_settings(node);
            }
            render_note(&ctx, &mut osc, &mut chain, timing)
        }
    };

    handle.collect_garbage();
    Ok(frames)
}

fn main() -> EyreResult<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Render {
            output,
            sample_rate,
            note,
        } => {
            let frames = render(&note, sample_rate)?;
            let stats = RenderStats::measure(&frames);
            render::write_wav(&output, sample_rate, &frames)?;

            println!("Render Statistics:");
            println!("------------------");
            println!("Duration:   {:.3} seconds", frames.len() as f32 / sample_rate as f32);
            println!("Frames:     {}", frames.len());
            println!("RMS level:  {:.4} ({:.1} dB)", stats.rms, 20.0 * stats.rms.log10());
            println!("Peak level: {:.4} ({:.1} dB)", stats.peak, 20.0 * stats.peak.log10());
            println!("Output:     {}", output.display());
        }
        Commands::Play { note } => {
            let sample_rate = playback::device_sample_rate()?;
            let frames = render(&note, sample_rate)?;
            playback::play(frames)?;
        }
    }

    Ok(())
}
