//! loopbox CLI: live looping from the terminal and offline WAV export.
//!
//! Usage:
//!   loopbox-cli play [--midi-port NAME] [--tempo BPM] [--metronome]
//!   loopbox-cli render --out demo.wav [--seconds 16]
//!   loopbox-cli midi-ports

use std::error::Error;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::{crate_version, Args, Parser, Subcommand};
use lb_master::{format_beat, list_midi_ports, Controller, LoopConfig, SessionConfig, DEFAULT_GAIN, DEFAULT_TEMPO};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const HELP: &str = "\
commands:
  r            record / play / stop
  c            clear the loop
  m            toggle metronome
  t BPM        set tempo (60-200)
  g GAIN       set gain (0-1)
  n NOTE [VEL] keyboard note on (velocity 0-1, default 1)
  o NOTE       keyboard note off
  s            show status
  q            quit";

#[derive(Parser)]
#[clap(version = crate_version!(), about = "A MIDI overdub looper with a sine synth and metronome.")]
struct Cli {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Runs the looper live on the default audio output.
    Play {
        /// Connect the first MIDI input port whose name contains this.
        #[arg(short, long)]
        midi_port: Option<String>,
        /// Skip MIDI input entirely.
        #[arg(long)]
        no_midi: bool,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Renders the built-in demo performance to a WAV file.
    Render {
        /// Output WAV path.
        #[arg(short, long)]
        out: PathBuf,
        /// Length of the render in seconds.
        #[arg(long, default_value_t = 16.0)]
        seconds: f64,
        /// Sample rate of the render.
        #[arg(long, default_value_t = 44100)]
        sample_rate: u32,
        #[command(flatten)]
        session: SessionArgs,
    },
    /// Lists the available MIDI input ports.
    MidiPorts {},
}

#[derive(Args)]
struct SessionArgs {
    /// Tempo in BPM (60-200).
    #[arg(short, long, default_value_t = DEFAULT_TEMPO)]
    tempo: f64,
    /// Master gain (0-1).
    #[arg(short, long, default_value_t = DEFAULT_GAIN)]
    gain: f32,
    /// Bars in the loop.
    #[arg(long, default_value_t = 4)]
    bars: u32,
    /// Beats per bar.
    #[arg(long, default_value_t = 4)]
    beats_per_bar: u32,
    /// Start with the metronome on.
    #[arg(long)]
    metronome: bool,
}

impl SessionArgs {
    fn to_config(&self) -> SessionConfig {
        SessionConfig {
            tempo: self.tempo,
            gain: self.gain,
            loop_config: LoopConfig {
                beats_per_bar: self.beats_per_bar.max(1),
                num_bars: self.bars.max(1),
            },
            metronome: self.metronome,
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Play { midi_port, no_midi, session } => play(session.to_config(), midi_port, no_midi),
        Commands::Render { out, seconds, sample_rate, session } => {
            render(session.to_config(), &out, seconds, sample_rate)
        }
        Commands::MidiPorts {} => {
            let ports = list_midi_ports()?;
            if ports.is_empty() {
                println!("No MIDI input ports found.");
            }
            for (i, name) in ports.iter().enumerate() {
                println!("{i}: {name}");
            }
            Ok(())
        }
    }
}

fn play(config: SessionConfig, midi_port: Option<String>, no_midi: bool) -> Result<(), Box<dyn Error>> {
    let mut ctrl = Controller::new(config);
    ctrl.start_audio()?;

    if !no_midi {
        match ctrl.connect_midi(midi_port.as_deref()) {
            Ok(name) => println!("MIDI input: {name}"),
            // A missing controller is fine, the keyboard commands still work.
            Err(e) if midi_port.is_none() => warn!(err = %e, "No MIDI input connected."),
            Err(e) => return Err(e.into()),
        }
    }

    println!("{HELP}");
    print_status(&ctrl);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut words = line.split_whitespace();
        let Some(command) = words.next() else {
            continue;
        };

        let result = match command {
            "r" => ctrl.toggle_transport(),
            "c" => ctrl.clear(),
            "m" => ctrl.toggle_metronome(),
            "t" => match parse_arg::<f64>(words.next()) {
                Some(bpm) => ctrl.set_tempo(bpm).map(|bpm| println!("tempo {bpm}")),
                None => {
                    println!("usage: t BPM");
                    Ok(())
                }
            },
            "g" => match parse_arg::<f32>(words.next()) {
                Some(gain) => ctrl.set_gain(gain).map(|gain| println!("gain {gain}")),
                None => {
                    println!("usage: g GAIN");
                    Ok(())
                }
            },
            "n" => match parse_arg::<u8>(words.next()) {
                Some(note) => {
                    let velocity = parse_arg::<f32>(words.next()).unwrap_or(1.0);
                    ctrl.note_on(note, velocity)
                }
                None => {
                    println!("usage: n NOTE [VEL]");
                    Ok(())
                }
            },
            "o" => match parse_arg::<u8>(words.next()) {
                Some(note) => ctrl.note_off(note),
                None => {
                    println!("usage: o NOTE");
                    Ok(())
                }
            },
            "s" => {
                print_status(&ctrl);
                Ok(())
            }
            "q" => break,
            _ => {
                println!("{HELP}");
                Ok(())
            }
        };

        if let Err(e) = result {
            error!(err = %e, "Command failed.");
        }
        io::stdout().flush()?;
    }

    info!("Quitting.");
    Ok(())
}

fn parse_arg<T: std::str::FromStr>(word: Option<&str>) -> Option<T> {
    word?.parse().ok()
}

fn print_status(ctrl: &Controller) {
    let status = ctrl.status();
    let mode = if status.is_recording() {
        "recording"
    } else if status.is_playing() {
        "playing"
    } else {
        "stopped"
    };
    println!(
        "{mode} | {} | loop {:>3.0}% | {:.1} BPM | gain {:.2} | metronome {} | {} notes",
        format_beat(&status),
        status.position_fraction() * 100.0,
        status.tempo,
        status.gain,
        if status.metronome_on { "on" } else { "off" },
        status.recorded_notes,
    );
    if status.dropped_events > 0 {
        warn!(dropped = status.dropped_events, "Events dropped by full buffers.");
    }
}

fn render(config: SessionConfig, out: &Path, seconds: f64, sample_rate: u32) -> Result<(), Box<dyn Error>> {
    let ctrl = Controller::new(config);
    println!("Rendering {seconds} s to {} at {sample_rate} Hz...", out.display());

    let wav = ctrl.render_demo_to_wav(sample_rate, seconds);
    fs::write(out, &wav)?;

    info!(path = %out.display(), bytes = wav.len(), "Wrote WAV.");
    Ok(())
}
