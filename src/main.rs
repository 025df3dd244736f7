use clap::{Parser, Subcommand};
use pitch2midi::{validate_input, Config, PitchToMidi, Window};
use std::path::PathBuf;

/// Wave-to-Notes Transcription System
#[derive(Parser)]
#[command(name = "pitch2midi")]
#[command(about = "Transcribe a WAV recording into a Standard MIDI File")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze audio file and generate MIDI output
    Analyze {
        /// Input audio file (WAV)
        input: PathBuf,

        /// Output MIDI file ("-" for stdout)
        #[arg(short, long, default_value = "output.mid")]
        output: PathBuf,

        /// Custom configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Patch WAV file used as the peak-removal envelope
        #[arg(short, long)]
        patch: Option<PathBuf>,

        /// FFT window length in samples (power of two recommended)
        #[arg(short = 'n', long)]
        window_length: Option<usize>,

        /// Analysis window: rectangular, parzen, welch, hanning, hamming,
        /// blackman, or steeper (or its number, 0-6)
        #[arg(short = 'w', long)]
        window: Option<String>,

        /// Analysis hop in samples (default: window length / 4)
        #[arg(short = 's', long)]
        shift: Option<usize>,

        /// log10 of the cutoff ratio used to scale velocity
        #[arg(short = 'c', long)]
        cutoff: Option<f64>,

        /// log10 of the cutoff ratio relative to the average power;
        /// selects relative-cutoff mode
        #[arg(short = 'r', long)]
        relative: Option<f64>,

        /// Velocity rise that re-triggers a sounding note (128 disables)
        #[arg(short = 'k', long)]
        peak: Option<i32>,

        /// Top of the note search range (MIDI number)
        #[arg(short = 't', long)]
        top: Option<u8>,

        /// Bottom of the note search range (MIDI number)
        #[arg(short = 'b', long)]
        bottom: Option<u8>,

        /// Pitch adjustment in half-notes
        #[arg(short = 'a', long)]
        adjust: Option<f64>,

        /// Half-width in bins of the local-average subtraction filter
        #[arg(long)]
        psub_n: Option<usize>,

        /// Subtraction factor for the local-average filter
        #[arg(long)]
        psub_f: Option<f64>,

        /// Subtraction factor for the octave-image filter
        #[arg(long)]
        oct: Option<f64>,

        /// Disable phase-vocoder frequency correction
        #[arg(long)]
        no_phase: bool,

        /// Dump the regulated event list to stdout
        #[arg(long)]
        dump_events: bool,

        /// Dump the per-note On-event histogram to stdout
        #[arg(long)]
        dump_bins: bool,

        /// Quiet output
        #[arg(short, long)]
        quiet: bool,
    },
    /// Validate configuration file
    ValidateConfig {
        /// Configuration file to validate
        config: PathBuf,
    },
    /// Show default configuration
    ShowConfig,
}

#[allow(clippy::too_many_arguments)]
fn apply_overrides(
    config: &mut Config,
    window_length: Option<usize>,
    window: Option<String>,
    shift: Option<usize>,
    cutoff: Option<f64>,
    relative: Option<f64>,
    peak: Option<i32>,
    top: Option<u8>,
    bottom: Option<u8>,
    adjust: Option<f64>,
    psub_n: Option<usize>,
    psub_f: Option<f64>,
    oct: Option<f64>,
    no_phase: bool,
) -> anyhow::Result<()> {
    if let Some(n) = window_length {
        config.fft.length = n;
    }
    if let Some(w) = window {
        config.fft.window = Window::parse(&w)?;
    }
    if let Some(s) = shift {
        config.fft.hop = s;
    }
    if let Some(c) = cutoff {
        config.notes.cut_ratio = c;
    }
    if let Some(r) = relative {
        config.notes.rel_cut_ratio = r;
        config.notes.absolute_cutoff = false;
    }
    if let Some(k) = peak {
        config.notes.peak_threshold = k;
    }
    if let Some(t) = top {
        config.notes.top = t;
    }
    if let Some(b) = bottom {
        config.notes.bottom = b;
    }
    if let Some(a) = adjust {
        config.notes.adj_pitch = a;
    }
    if let Some(n) = psub_n {
        config.filters.psub_n = n;
    }
    if let Some(f) = psub_f {
        config.filters.psub_f = f;
    }
    if let Some(f) = oct {
        config.filters.oct_f = f;
    }
    if no_phase {
        config.filters.use_phase = false;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            patch,
            window_length,
            window,
            shift,
            cutoff,
            relative,
            peak,
            top,
            bottom,
            adjust,
            psub_n,
            psub_f,
            oct,
            no_phase,
            dump_events,
            dump_bins,
            quiet,
        } => {
            // Load configuration
            let mut config = if let Some(config_path) = config {
                pitch2midi::config::load_config(config_path)?
            } else {
                Config::default()
            };
            apply_overrides(
                &mut config,
                window_length,
                window,
                shift,
                cutoff,
                relative,
                peak,
                top,
                bottom,
                adjust,
                psub_n,
                psub_f,
                oct,
                no_phase,
            )?;

            // Validate input
            validate_input(&input, &config)?;

            // Create processor
            let processor = PitchToMidi::new(config);

            if !quiet {
                eprintln!("Processing {}...", input.display());
            }

            let (notes, division, summary) = processor.transcribe(&input, patch.as_deref())?;
            if dump_events {
                notes.dump();
            }
            if dump_bins {
                for (note, &count) in notes.bins().iter().enumerate() {
                    if count > 0 {
                        println!("note {:3}: {}", note, count);
                    }
                }
            }
            pitch2midi::smf::output_midi(&notes, division, &output)?;

            if !quiet {
                eprintln!(
                    "{} events (notes {} to {}), division {}",
                    summary.events, summary.minimum, summary.maximum, summary.division
                );
                if let Some(adj) = summary.suggested_pitch_adjustment {
                    eprintln!("suggested pitch adjustment: -a {:.4}", adj);
                }
                if output.as_os_str() != "-" {
                    eprintln!("MIDI written to {}", output.display());
                }
            }
        }
        Commands::ValidateConfig { config } => {
            let config = pitch2midi::config::load_config(config)?;
            println!("Configuration is valid");
            if let Ok(json) = serde_json::to_string_pretty(&config) {
                println!("{}", json);
            }
        }
        Commands::ShowConfig => {
            let config = Config::default();
            let json = serde_json::to_string_pretty(&config)?;
            println!("{}", json);
        }
    }

    Ok(())
}
