//! Offline bounce: places two WAV files on a timeline so the second starts
//! `--overlap-ms` before the first ends, crossfades the shared region and
//! writes the mix to a WAV file.
//!
//! ```bash
//! clip_engine first.wav second.wav --overlap-ms 2000 -o mix.wav
//! ```

use std::{io, path::PathBuf, sync::Arc};

use anyhow::{Context, bail};
use clap::Parser;
use clip_engine::{
    AudioClip, AudioOverlap, AudioRead, ClipTiming, OutputFormat, SampleFormat,
    clip::fades::FadeCurve,
    lock_clip,
    overlap::transition::CrossfadeTransition,
    source::{SampleData, WavMediaParser},
};
use hound::{SampleFormat as WavSampleFormat, WavSpec, WavWriter};
use log::info;
use transport::time::{ms_to_samples, secs_to_ms};

// error types come from the library
use thiserror as _;

/// Crossfade two WAV files into one
#[derive(Parser, Debug)]
#[clap(name = "clip_engine")]
struct Args {
    /// Clip that plays first
    front: PathBuf,

    /// Clip that fades in over the tail of the first
    rear: PathBuf,

    /// Length of the shared region (ms)
    #[clap(long, default_value = "1000")]
    overlap_ms: i64,

    /// Use an equal-power curve instead of a linear one
    #[clap(long)]
    equal_power: bool,

    /// Frames per read
    #[clap(long, default_value = "1024")]
    block: usize,

    #[clap(short, long, value_name = "FILE", default_value = "bounce.wav")]
    output: PathBuf,
}

type Writer = WavWriter<io::BufWriter<std::fs::File>>;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = Args::parse();
    if args.block == 0 {
        bail!("--block must be at least 1");
    }

    let front_parser = WavMediaParser::from_file(&args.front)
        .with_context(|| format!("loading {}", args.front.display()))?;
    let rear_parser = WavMediaParser::from_file(&args.rear)
        .with_context(|| format!("loading {}", args.rear.display()))?;

    let format = OutputFormat::new(
        front_parser.channels(),
        front_parser.sample_rate(),
        SampleFormat::F32,
    );
    let front_duration = secs_to_ms(front_parser.duration_secs());
    let rear_duration = secs_to_ms(rear_parser.duration_secs());
    if args.overlap_ms <= 0 || args.overlap_ms >= front_duration.min(rear_duration) {
        bail!(
            "--overlap-ms must be in (0, {}) for these files",
            front_duration.min(rear_duration)
        );
    }

    let rear_start = front_duration - args.overlap_ms;
    let front = AudioClip::new(
        1,
        front_parser.into_shared(),
        format,
        ClipTiming::new(0, front_duration, 0, 0),
    )?
    .into_shared();
    let rear = AudioClip::new(
        2,
        rear_parser.into_shared(),
        format,
        ClipTiming::new(rear_start, rear_start + rear_duration, 0, 0),
    )?
    .into_shared();

    let curve = if args.equal_power {
        FadeCurve::EqualPower
    } else {
        FadeCurve::Linear
    };
    let mut overlap = AudioOverlap::new(1, Arc::clone(&front), Arc::clone(&rear));
    overlap.set_transition(Some(Box::new(CrossfadeTransition::new(curve))));
    info!(
        "front {} / rear {} / overlap {overlap}",
        lock_clip(&front),
        lock_clip(&rear)
    );

    let spec = WavSpec {
        channels: format.channels as u16,
        sample_rate: format.sample_rate,
        bits_per_sample: 32,
        sample_format: WavSampleFormat::Float,
    };
    let mut writer = WavWriter::create(&args.output, spec)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let front_only = ms_to_samples(overlap.start(), format.sample_rate) as usize;
    let written = drain(&mut writer, front_only, args.block, |count| {
        lock_clip(&front).read_audio_samples(count)
    })?;
    info!("front only: {written} frames");

    overlap.seek_to(0)?;
    let written = drain(&mut writer, usize::MAX, args.block, |count| {
        overlap.read_audio_samples(count)
    })?;
    info!("overlap: {written} frames");

    {
        let mut rear = lock_clip(&rear);
        let pos = overlap.end() - rear.start();
        rear.seek_to(pos)?;
    }
    let written = drain(&mut writer, usize::MAX, args.block, |count| {
        lock_clip(&rear).read_audio_samples(count)
    })?;
    info!("rear only: {written} frames");

    writer.finalize()?;
    info!("wrote {}", args.output.display());
    Ok(())
}

/// Pulls up to `limit` frames through `next` in `block`-sized steps and
/// appends them to `writer`. Returns the number of frames written.
fn drain(
    writer: &mut Writer,
    limit: usize,
    block: usize,
    mut next: impl FnMut(usize) -> clip_engine::Result<AudioRead>,
) -> anyhow::Result<usize> {
    let mut written = 0;
    while written < limit {
        let read = next(block.min(limit - written))?;
        let frames = read.samples();
        match read.batch.into_data() {
            SampleData::F32(samples) => {
                for sample in samples {
                    writer.write_sample(sample)?;
                }
            }
            SampleData::S16(samples) => {
                for sample in samples {
                    writer.write_sample(f32::from(sample) / f32::from(i16::MAX))?;
                }
            }
        }
        written += frames;
        if read.eof || frames == 0 {
            break;
        }
    }
    Ok(written)
}
