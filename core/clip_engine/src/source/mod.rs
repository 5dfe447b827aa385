//! The decoder side of a clip: a parsed media source and the reader that
//! decodes it to a configured output format.

use std::{fmt, sync::Arc};

use thiserror::Error;
use transport::PlayDirection;

pub mod batch;
pub mod format;
pub mod wav;

#[cfg(test)]
pub(crate) mod scripted;

pub use batch::{AudioBatch, AudioRead, SampleData};
pub use format::{OutputFormat, SampleFormat};
pub use wav::{WavMediaParser, WavSourceReader};

/// Failure reported by a source reader, with the reader's own text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct SourceError(pub String);

impl From<&str> for SourceError {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for SourceError {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Facts about the decoded audio stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AudioStreamInfo {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u32,
}

/// A parsed media source. Knows where it came from, whether it has audio and
/// how to make readers over itself.
pub trait MediaParser: Send + Sync + fmt::Debug {
    fn url(&self) -> &str;

    /// Index of the preferred audio stream, `None` if the media has no audio.
    fn best_audio_stream_index(&self) -> Option<usize>;

    /// A fresh, unopened reader for this source.
    fn create_reader(&self) -> Box<dyn SourceReader>;
}

/// Decodes one source into output-format sample batches.
///
/// Lifecycle: [`open`](SourceReader::open), then
/// [`config_audio_reader`](SourceReader::config_audio_reader), then
/// [`start`](SourceReader::start). Seeks and reads are only valid once started.
/// Seek and read granularity is up to the implementation; callers compare
/// [`read_pos`](SourceReader::read_pos) with where they expect to be.
pub trait SourceReader: Send + fmt::Debug {
    fn open(&mut self, parser: Arc<dyn MediaParser>) -> Result<(), SourceError>;

    fn config_audio_reader(&mut self, format: OutputFormat) -> Result<(), SourceError>;

    fn start(&mut self) -> Result<(), SourceError>;

    fn seek_to(&mut self, pos_ms: i64) -> Result<(), SourceError>;

    /// Reads up to `sample_count` frames in the current direction. The batch
    /// timestamp is the source position of its first frame; `eof` is set once
    /// the stream boundary in that direction is reached.
    fn read_audio_samples(&mut self, sample_count: usize) -> Result<AudioRead, SourceError>;

    /// Current source position in ms.
    fn read_pos(&self) -> i64;

    fn direction(&self) -> PlayDirection;

    fn set_direction(&mut self, direction: PlayDirection);

    fn out_sample_rate(&self) -> u32;

    fn out_channels(&self) -> u32;

    /// Bytes per output frame.
    fn out_frame_size(&self) -> usize;

    fn audio_stream(&self) -> Option<AudioStreamInfo>;
}
