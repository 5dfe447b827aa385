use crate::source::format::SampleFormat;

/// Interleaved PCM in one of the supported encodings.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleData {
    F32(Vec<f32>),
    S16(Vec<i16>),
}

impl SampleData {
    pub fn silence(format: SampleFormat, len: usize) -> Self {
        match format {
            SampleFormat::F32 => Self::F32(vec![0.0; len]),
            SampleFormat::S16 => Self::S16(vec![0; len]),
        }
    }

    /// Encodes normalized `f32` samples into `format`.
    pub fn from_f32(format: SampleFormat, samples: Vec<f32>) -> Self {
        match format {
            SampleFormat::F32 => Self::F32(samples),
            SampleFormat::S16 => Self::S16(samples.into_iter().map(f32_to_s16).collect()),
        }
    }

    pub const fn format(&self) -> SampleFormat {
        match self {
            Self::F32(_) => SampleFormat::F32,
            Self::S16(_) => SampleFormat::S16,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::F32(v) => v.len(),
            Self::S16(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sample `index` as a normalized float.
    pub fn get_f32(&self, index: usize) -> Option<f32> {
        match self {
            Self::F32(v) => v.get(index).copied(),
            Self::S16(v) => v.get(index).map(|s| f32::from(*s) / f32::from(i16::MAX)),
        }
    }

    pub fn is_silent(&self) -> bool {
        match self {
            Self::F32(v) => v.iter().all(|s| *s == 0.0),
            Self::S16(v) => v.iter().all(|s| *s == 0),
        }
    }
}

fn f32_to_s16(sample: f32) -> i16 {
    (sample * f32::from(i16::MAX))
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

/// A run of interleaved frames with the position (ms) of its first frame.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBatch {
    data: SampleData,
    channels: u32,
    timestamp_ms: i64,
}

impl AudioBatch {
    pub fn new(data: SampleData, channels: u32, timestamp_ms: i64) -> Self {
        Self {
            data,
            channels: channels.max(1),
            timestamp_ms,
        }
    }

    pub fn empty(format: SampleFormat, channels: u32) -> Self {
        Self::silence(format, channels, 0, 0)
    }

    /// `frames` zero-valued frames laid out as `channels` x `format`.
    pub fn silence(format: SampleFormat, channels: u32, frames: usize, timestamp_ms: i64) -> Self {
        let channels = channels.max(1);
        Self::new(
            SampleData::silence(format, frames * channels as usize),
            channels,
            timestamp_ms,
        )
    }

    pub const fn data(&self) -> &SampleData {
        &self.data
    }

    pub fn into_data(self) -> SampleData {
        self.data
    }

    pub const fn channels(&self) -> u32 {
        self.channels
    }

    pub const fn format(&self) -> SampleFormat {
        self.data.format()
    }

    /// Samples per channel.
    pub fn frames(&self) -> usize {
        self.data.len() / self.channels as usize
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub const fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    pub fn set_timestamp_ms(&mut self, timestamp_ms: i64) {
        self.timestamp_ms = timestamp_ms;
    }

    /// Scales every sample of frame `i` by `gain(i)`.
    pub fn apply_gain(&mut self, gain: impl Fn(usize) -> f32) {
        let channels = self.channels as usize;
        match &mut self.data {
            SampleData::F32(samples) => {
                for (i, frame) in samples.chunks_exact_mut(channels).enumerate() {
                    let g = gain(i);
                    frame.iter_mut().for_each(|s| *s *= g);
                }
            }
            SampleData::S16(samples) => {
                for (i, frame) in samples.chunks_exact_mut(channels).enumerate() {
                    let g = gain(i);
                    frame
                        .iter_mut()
                        .for_each(|s| *s = (f32::from(*s) * g).round() as i16);
                }
            }
        }
    }

    /// Weighted sum of two batches, frame by frame: `weights(i)` yields the
    /// (self, other) gains for frame `i`. The result takes this batch's
    /// layout and timestamp and the shorter of the two lengths. An empty
    /// side yields a copy of the other.
    pub fn mix_with(&self, other: &Self, weights: impl Fn(usize) -> (f32, f32)) -> Self {
        if other.is_empty() {
            return self.clone();
        }
        if self.is_empty() {
            return other.clone();
        }

        let channels = self.channels as usize;
        let frames = self.frames().min(other.frames());
        let mut mixed = Vec::with_capacity(frames * channels);
        for i in 0..frames {
            let (wa, wb) = weights(i);
            for c in 0..channels {
                let a = self.data.get_f32(i * channels + c).unwrap_or(0.0);
                let b = other
                    .data
                    .get_f32(i * other.channels as usize + c % other.channels as usize)
                    .unwrap_or(0.0);
                mixed.push(a * wa + b * wb);
            }
        }

        Self::new(
            SampleData::from_f32(self.format(), mixed),
            self.channels,
            self.timestamp_ms,
        )
    }
}

/// Outcome of a read: the produced batch and whether the reader is done.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioRead {
    pub batch: AudioBatch,
    pub eof: bool,
}

impl AudioRead {
    pub const fn new(batch: AudioBatch, eof: bool) -> Self {
        Self { batch, eof }
    }

    /// Nothing produced, end reached.
    pub fn finished(format: SampleFormat, channels: u32) -> Self {
        Self::new(AudioBatch::empty(format, channels), true)
    }

    /// Number of frames actually read.
    pub fn samples(&self) -> usize {
        self.batch.frames()
    }
}

#[cfg(test)]
mod batch_tests {
    use super::*;
    use crate::constants::AUDIO_SAMPLE_EPSILON;

    #[test]
    fn test_silence_has_requested_layout() {
        let batch = AudioBatch::silence(SampleFormat::S16, 2, 10, 500);
        assert_eq!(batch.frames(), 10);
        assert_eq!(batch.data().len(), 20);
        assert_eq!(batch.format(), SampleFormat::S16);
        assert_eq!(batch.timestamp_ms(), 500);
        assert!(batch.data().is_silent());
    }

    #[test]
    fn test_f32_to_s16_encoding_clamps() {
        let data = SampleData::from_f32(SampleFormat::S16, vec![0.0, 1.0, -2.0]);
        assert_eq!(data, SampleData::S16(vec![0, i16::MAX, i16::MIN]));
    }

    #[test]
    fn test_gain_applies_per_frame() {
        let mut batch = AudioBatch::new(SampleData::F32(vec![1.0, 1.0, 1.0, 1.0]), 2, 0);
        batch.apply_gain(|i| if i == 0 { 0.5 } else { 0.25 });
        assert_eq!(batch.data(), &SampleData::F32(vec![0.5, 0.5, 0.25, 0.25]));
    }

    #[test]
    fn test_mix_with_weights_both_sides() {
        let a = AudioBatch::new(SampleData::F32(vec![1.0, 1.0]), 1, 100);
        let b = AudioBatch::new(SampleData::F32(vec![0.5, 0.5]), 1, 200);
        let mixed = a.mix_with(&b, |i| if i == 0 { (1.0, 0.0) } else { (0.5, 1.0) });

        assert_eq!(mixed.timestamp_ms(), 100);
        assert!((mixed.data().get_f32(0).unwrap() - 1.0).abs() < AUDIO_SAMPLE_EPSILON);
        assert!((mixed.data().get_f32(1).unwrap() - 1.0).abs() < AUDIO_SAMPLE_EPSILON);
    }

    #[test]
    fn test_mix_with_empty_returns_other_side() {
        let a = AudioBatch::empty(SampleFormat::F32, 1);
        let b = AudioBatch::new(SampleData::F32(vec![0.5]), 1, 7);
        assert_eq!(a.mix_with(&b, |_| (1.0, 1.0)), b);
    }
}
