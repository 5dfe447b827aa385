use std::{io::Read, path::Path, sync::Arc};

use hound::WavReader;
use transport::{
    PlayDirection,
    time::{ms_to_samples, samples_to_ms},
};

use crate::source::{
    AudioBatch, AudioRead, AudioStreamInfo, MediaParser, OutputFormat, SampleData, SourceError,
    SourceReader,
};

/// Decoded, normalized PCM shared by a parser and all readers over it.
#[derive(Debug)]
struct PcmSource {
    /// Interleaved `f32` samples
    samples: Vec<f32>,
    channels: u32,
    sample_rate: u32,
}

impl PcmSource {
    fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }

    fn sample(&self, frame: usize, channel: u32) -> f32 {
        let frame = frame.min(self.frames().saturating_sub(1));
        self.samples
            .get(frame * self.channels as usize + channel as usize)
            .copied()
            .unwrap_or(0.0)
    }
}

/// `WavMediaParser` holds a `.wav` file decoded into memory.
///
/// Supports:
/// - Any channel count
/// - 8/16/24/32-bit integer or 32-bit float samples (converted to `f32`)
///
/// # Example
/// ```no_run
/// use clip_engine::source::WavMediaParser;
///
/// let parser = WavMediaParser::from_file("assets/wav/piano.wav").unwrap();
/// ```
#[derive(Debug, Clone)]
pub struct WavMediaParser {
    url: String,
    pcm: Arc<PcmSource>,
}

impl WavMediaParser {
    fn from_reader<R: Read>(reader: WavReader<R>, url: &str) -> Result<Self, SourceError> {
        let spec = reader.spec();
        if spec.channels == 0 {
            return Err("WAV has no channels".into());
        }

        let samples = Self::decode_pcm_samples(reader)?;
        Ok(Self {
            url: url.to_owned(),
            pcm: Arc::new(PcmSource {
                samples,
                channels: u32::from(spec.channels),
                sample_rate: spec.sample_rate,
            }),
        })
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SourceError> {
        let url = path.as_ref().to_string_lossy().into_owned();
        let reader =
            WavReader::open(&path).map_err(|e| format!("Failed to open WAV file: {e}"))?;
        Self::from_reader(reader, &url)
    }

    pub fn from_stream<R: Read>(stream: R, url: &str) -> Result<Self, SourceError> {
        let reader =
            WavReader::new(stream).map_err(|e| format!("Failed to parse WAV stream: {e}"))?;
        Self::from_reader(reader, url)
    }

    /// Wraps already-decoded interleaved samples.
    pub fn from_raw_samples(samples: Vec<f32>, channels: u32, sample_rate: u32, url: &str) -> Self {
        Self {
            url: url.to_owned(),
            pcm: Arc::new(PcmSource {
                samples,
                channels: channels.max(1),
                sample_rate,
            }),
        }
    }

    fn decode_pcm_samples<R: Read>(reader: WavReader<R>) -> Result<Vec<f32>, SourceError> {
        let spec = reader.spec();
        let samples = match spec.sample_format {
            hound::SampleFormat::Int => {
                let scale = (1_i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|s| s as f32 / scale))
                    .collect::<Result<Vec<f32>, _>>()
            }
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<f32>, _>>(),
        };

        samples.map_err(|e| SourceError(format!("Failed to decode WAV samples: {e}")))
    }

    pub fn channels(&self) -> u32 {
        self.pcm.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.pcm.sample_rate
    }

    pub fn duration_secs(&self) -> f64 {
        if self.pcm.sample_rate == 0 {
            return 0.0;
        }
        self.pcm.frames() as f64 / f64::from(self.pcm.sample_rate)
    }

    pub fn into_shared(self) -> Arc<dyn MediaParser> {
        Arc::new(self)
    }
}

impl MediaParser for WavMediaParser {
    fn url(&self) -> &str {
        &self.url
    }

    fn best_audio_stream_index(&self) -> Option<usize> {
        (self.pcm.channels > 0).then_some(0)
    }

    fn create_reader(&self) -> Box<dyn SourceReader> {
        Box::new(WavSourceReader::new(Arc::clone(&self.pcm)))
    }
}

/// Reads in-memory WAV PCM at a configured output format, forward or in
/// reverse. Rate conversion is linear interpolation; channels are mapped by
/// duplication, or averaged when folding down to mono.
#[derive(Debug)]
pub struct WavSourceReader {
    pcm: Arc<PcmSource>,
    parser: Option<Arc<dyn MediaParser>>,
    format: Option<OutputFormat>,
    started: bool,
    /// Current read position (output frame index)
    position: i64,
    direction: PlayDirection,
}

impl WavSourceReader {
    fn new(pcm: Arc<PcmSource>) -> Self {
        Self {
            pcm,
            parser: None,
            format: None,
            started: false,
            position: 0,
            direction: PlayDirection::Forward,
        }
    }

    fn started_format(&self) -> Result<OutputFormat, SourceError> {
        match self.format {
            Some(format) if self.started => Ok(format),
            _ => Err("WAV reader is not started".into()),
        }
    }

    fn total_out_frames(&self, format: &OutputFormat) -> i64 {
        if self.pcm.sample_rate == 0 {
            return 0;
        }
        self.pcm.frames() as i64 * i64::from(format.sample_rate) / i64::from(self.pcm.sample_rate)
    }

    fn source_sample(&self, src_frame: usize, out_channel: u32, out_channels: u32) -> f32 {
        let src_channels = self.pcm.channels;
        if out_channels == 1 && src_channels > 1 {
            let sum: f32 = (0..src_channels).map(|c| self.pcm.sample(src_frame, c)).sum();
            sum / src_channels as f32
        } else {
            self.pcm.sample(src_frame, out_channel % src_channels)
        }
    }

    fn render_frame(&self, out_frame: i64, format: &OutputFormat, dest: &mut Vec<f32>) {
        let ratio = f64::from(self.pcm.sample_rate) / f64::from(format.sample_rate);
        let src_pos = out_frame as f64 * ratio;
        let index = src_pos.floor() as usize;
        let frac = (src_pos - src_pos.floor()) as f32;

        for c in 0..format.channels {
            let a = self.source_sample(index, c, format.channels);
            let sample = if frac > 0.0 {
                let b = self.source_sample(index + 1, c, format.channels);
                a + (b - a) * frac
            } else {
                a
            };
            dest.push(sample);
        }
    }
}

impl SourceReader for WavSourceReader {
    fn open(&mut self, parser: Arc<dyn MediaParser>) -> Result<(), SourceError> {
        if parser.best_audio_stream_index().is_none() {
            return Err(format!("'{}' has no audio stream", parser.url()).into());
        }
        self.parser = Some(parser);
        Ok(())
    }

    fn config_audio_reader(&mut self, format: OutputFormat) -> Result<(), SourceError> {
        if self.parser.is_none() {
            return Err("WAV reader is not opened".into());
        }
        if format.channels == 0 || format.sample_rate == 0 {
            return Err(format!(
                "Invalid output format: {} channels at {}Hz",
                format.channels, format.sample_rate
            )
            .into());
        }
        self.format = Some(format);
        Ok(())
    }

    fn start(&mut self) -> Result<(), SourceError> {
        if self.format.is_none() {
            return Err("WAV reader is not configured".into());
        }
        self.started = true;
        Ok(())
    }

    fn seek_to(&mut self, pos_ms: i64) -> Result<(), SourceError> {
        let format = self.started_format()?;
        let total = self.total_out_frames(&format);
        self.position = ms_to_samples(pos_ms, format.sample_rate).clamp(0, total);
        Ok(())
    }

    fn read_audio_samples(&mut self, sample_count: usize) -> Result<AudioRead, SourceError> {
        let format = self.started_format()?;
        let total = self.total_out_frames(&format);
        let timestamp_ms = samples_to_ms(self.position, format.sample_rate);
        let count = sample_count as i64;

        let mut samples = Vec::with_capacity(sample_count * format.channels as usize);
        let eof = match self.direction {
            PlayDirection::Forward => {
                let end = (self.position + count).min(total);
                for frame in self.position.max(0)..end {
                    self.render_frame(frame, &format, &mut samples);
                }
                self.position = end.max(self.position);
                self.position >= total
            }
            PlayDirection::Reverse => {
                let start = (self.position - count).max(0);
                for frame in (start..self.position.min(total)).rev() {
                    self.render_frame(frame, &format, &mut samples);
                }
                self.position = start.min(self.position);
                self.position <= 0
            }
        };

        let batch = AudioBatch::new(
            SampleData::from_f32(format.sample_format, samples),
            format.channels,
            timestamp_ms,
        );
        Ok(AudioRead::new(batch, eof))
    }

    fn read_pos(&self) -> i64 {
        self.format
            .map_or(0, |format| samples_to_ms(self.position, format.sample_rate))
    }

    fn direction(&self) -> PlayDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: PlayDirection) {
        self.direction = direction;
    }

    fn out_sample_rate(&self) -> u32 {
        self.format.map_or(0, |f| f.sample_rate)
    }

    fn out_channels(&self) -> u32 {
        self.format.map_or(0, |f| f.channels)
    }

    fn out_frame_size(&self) -> usize {
        self.format.map_or(0, |f| f.frame_size())
    }

    fn audio_stream(&self) -> Option<AudioStreamInfo> {
        if self.parser.is_none() {
            return None;
        }
        let duration_secs = if self.pcm.sample_rate == 0 {
            0.0
        } else {
            self.pcm.frames() as f64 / f64::from(self.pcm.sample_rate)
        };
        Some(AudioStreamInfo {
            duration_secs,
            sample_rate: self.pcm.sample_rate,
            channels: self.pcm.channels,
        })
    }
}
