#![forbid(unsafe_code)]

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{LevelFilter, info};

use m4venc::{Encoder, EncoderConfig, FramePixels, FrameType};

#[derive(Parser, Debug)]
#[command(name = "m4venc")]
#[command(about = "Encode a YUV4MPEG2 file to an MPEG-4 part 2 elementary stream.")]
struct Cli {
    /// Input .y4m file (4:2:0).
    input: PathBuf,

    /// Output .m4v file.
    #[arg(short, long)]
    output: PathBuf,

    /// Target bitrate in bits per second (suffixes k and M accepted).
    #[arg(long, value_parser = parse_bitrate, default_value = "910k")]
    bitrate: u64,

    /// Frame rate; defaults to the rate in the y4m header, else 25.
    #[arg(long)]
    fps: Option<f64>,

    /// Maximum distance between key frames; 0 never forces one.
    #[arg(long, default_value_t = 250)]
    keyint: usize,

    /// Motion search effort, 1 (fastest) to 5.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(i32).range(1..=5))]
    quality: i32,

    #[arg(long = "min-q", default_value_t = 2, value_parser = clap::value_parser!(i32).range(1..=31))]
    min_q: i32,

    #[arg(long = "max-q", default_value_t = 15, value_parser = clap::value_parser!(i32).range(1..=31))]
    max_q: i32,

    /// Frames averaged by the long-term rate estimate.
    #[arg(long, default_value_t = 50)]
    rc_period: i32,

    /// Frames averaged by the short-term rate estimate.
    #[arg(long, default_value_t = 10)]
    rc_reaction_period: i32,

    #[arg(long, default_value_t = 10)]
    rc_reaction_ratio: i32,

    /// Use the mean absolute difference from the previous frame as a rate
    /// control hint.
    #[arg(long)]
    mad_hint: bool,

    /// Report time spent per encoder stage.
    #[arg(long)]
    profile: bool,

    /// Log every macroblock (needs -vvv or RUST_LOG=trace).
    #[arg(long)]
    trace: bool,

    /// Increase log verbosity.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_bitrate(s: &str) -> Result<u64, String> {
    let (num, mult) = if let Some(n) = s.strip_suffix('k').or_else(|| s.strip_suffix('K')) {
        (n, 1_000u64)
    } else if let Some(n) = s.strip_suffix('m').or_else(|| s.strip_suffix('M')) {
        (n, 1_000_000u64)
    } else {
        (s, 1u64)
    };
    num.parse::<u64>()
        .ok()
        .and_then(|v| v.checked_mul(mult))
        .filter(|&v| v > 0 && v <= i64::MAX as u64)
        .ok_or_else(|| format!("invalid bitrate: {s}"))
}

fn init_logging(verbose: u8) {
    let mut builder = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    match verbose {
        0 => {}
        1 => {
            builder.filter_level(LevelFilter::Info);
        }
        2 => {
            builder.filter_level(LevelFilter::Debug);
        }
        _ => {
            builder.filter_level(LevelFilter::Trace);
        }
    }
    builder.init();
}

impl Cli {
    fn encoder_config(&self, header_fps: Option<f64>) -> EncoderConfig {
        EncoderConfig {
            framerate: self.fps.or(header_fps).unwrap_or(25.0),
            bitrate: self.bitrate as i64,
            rc_period: self.rc_period,
            rc_reaction_period: self.rc_reaction_period,
            rc_reaction_ratio: self.rc_reaction_ratio,
            min_quantizer: self.min_q,
            max_quantizer: self.max_q,
            max_key_interval: if self.keyint == 0 { usize::MAX } else { self.keyint },
            quality: self.quality,
            trace_macroblocks: self.trace,
            mad_hint: self.mad_hint,
            profile: self.profile,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (header, frames) = FramePixels::all_from_y4m_file(&cli.input)
        .with_context(|| format!("reading {}", cli.input.display()))?;
    if frames.is_empty() {
        bail!("no frames in {}", cli.input.display());
    }
    if cli.min_q > cli.max_q {
        bail!("--min-q {} is above --max-q {}", cli.min_q, cli.max_q);
    }

    let config = cli.encoder_config(header.framerate);
    info!(
        "{}x{} @ {:.3} fps, {} frames, {} bit/s",
        header.width,
        header.height,
        config.framerate,
        frames.len(),
        config.bitrate
    );
    let mut encoder = Encoder::new(header.width, header.height, config)
        .context("creating encoder")?;

    let file = File::create(&cli.output)
        .with_context(|| format!("creating {}", cli.output.display()))?;
    let mut out = BufWriter::new(file);

    let mut total = 0usize;
    let mut keys = 0usize;
    for (index, frame) in frames.iter().enumerate() {
        let packet = encoder
            .encode_frame(frame)
            .with_context(|| format!("encoding frame {index}"))?;
        let frame_type = match packet.frame_type {
            FrameType::Key => {
                keys += 1;
                "KEY"
            }
            FrameType::Delta => "DELTA",
        };
        eprintln!(
            "frame {:>4}  {:>5}  q={:<2}  {} bytes",
            packet.frame_number,
            frame_type,
            packet.quant,
            packet.data.len()
        );
        out.write_all(&packet.data)
            .with_context(|| format!("writing {}", cli.output.display()))?;
        total += packet.data.len();
    }
    out.flush()
        .with_context(|| format!("writing {}", cli.output.display()))?;

    eprintln!();
    eprintln!(
        "Wrote {} bytes to {} ({} frames, {} key)",
        total,
        cli.output.display(),
        frames.len(),
        keys
    );
    if let Some(stats) = encoder.rate_control_stats() {
        eprintln!(
            "Rate control: target={} bits/frame, average={} bits/frame, q={}",
            stats.target_bits_per_frame, stats.average_bits, stats.quant
        );
    }
    if cli.profile {
        eprintln!("{}", encoder.profile().summary());
    }
    Ok(())
}
