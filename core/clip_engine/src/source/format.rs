use std::{fmt, str::FromStr};

/// Sample encoding produced by a configured reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SampleFormat {
    #[default]
    F32,
    S16,
}

impl SampleFormat {
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            Self::F32 => 4,
            Self::S16 => 2,
        }
    }
}

impl FromStr for SampleFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "f32" | "flt" => Ok(Self::F32),
            "s16" => Ok(Self::S16),
            other => Err(format!("Unsupported sample format '{other}'")),
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::F32 => f.write_str("f32"),
            Self::S16 => f.write_str("s16"),
        }
    }
}

/// Channel count, rate and encoding a clip asks its reader to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub channels: u32,
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
}

impl OutputFormat {
    pub const fn new(channels: u32, sample_rate: u32, sample_format: SampleFormat) -> Self {
        Self {
            channels,
            sample_rate,
            sample_format,
        }
    }

    /// Bytes per interleaved frame (one sample on every channel).
    pub const fn frame_size(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }
}
