//! Timeline audio clips over a decoded source: trimming, seeking,
//! forward/reverse reads with drift correction, and overlap mixing of two
//! clips through a pluggable transition.

pub mod clip;
pub mod config;
pub mod constants;
pub mod error;
pub mod overlap;
pub mod source;

pub use clip::{AudioClip, ClipHolder, ClipTiming, lock_clip};
pub use config::ClipSettings;
pub use error::{ClipError, Result};
pub use overlap::AudioOverlap;
pub use source::{AudioBatch, AudioRead, OutputFormat, SampleFormat};
pub use transport::PlayDirection;

// used by the bounce binary and the test logger
use anyhow as _;
use clap as _;
use env_logger as _;
