use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{
    clip::{fades::Fade, params::ClipParams},
    source::AudioBatch,
};

/// PCM transform bound to one clip. The clip hands every non-empty batch it
/// produces to [`filter_pcm`](AudioFilter::filter_pcm) before returning it.
pub trait AudioFilter: Send + fmt::Debug {
    /// Called when the filter is attached. The reference is to the clip's
    /// parameters, not the clip, and is only valid while the clip lives.
    fn apply_to(&mut self, clip: Weak<ClipParams>);

    /// `pos_ms` is where the batch starts within the clip, `duration_ms` the
    /// clip's full trimmed length.
    fn filter_pcm(&mut self, batch: AudioBatch, pos_ms: i64, duration_ms: i64) -> AudioBatch;
}

/// Fades a clip in from its head and out toward its tail. Assumes the batch
/// runs forward in time from `pos_ms`.
#[derive(Debug)]
pub struct FadeFilter {
    fade_in: Fade,
    fade_out: Fade,
    clip: Weak<ClipParams>,
}

impl FadeFilter {
    pub fn new(fade_in: Fade, fade_out: Fade) -> Self {
        Self {
            fade_in,
            fade_out,
            clip: Weak::new(),
        }
    }

    pub fn clip(&self) -> Option<Arc<ClipParams>> {
        self.clip.upgrade()
    }

    fn gain_at(&self, pos_ms: f32, duration_ms: i64) -> f32 {
        let mut gain = 1.0;
        if !self.fade_in.is_none() && pos_ms < self.fade_in.length_ms as f32 {
            gain *= self
                .fade_in
                .curve
                .fade_in(pos_ms / self.fade_in.length_ms as f32);
        }
        let fade_out_start = (duration_ms - self.fade_out.length_ms) as f32;
        if !self.fade_out.is_none() && pos_ms > fade_out_start {
            gain *= self
                .fade_out
                .curve
                .fade_out((pos_ms - fade_out_start) / self.fade_out.length_ms as f32);
        }
        gain
    }
}

impl AudioFilter for FadeFilter {
    fn apply_to(&mut self, clip: Weak<ClipParams>) {
        self.clip = clip;
    }

    fn filter_pcm(&mut self, mut batch: AudioBatch, pos_ms: i64, duration_ms: i64) -> AudioBatch {
        let sample_rate = match self.clip.upgrade() {
            Some(params) if params.out_sample_rate() > 0 => params.out_sample_rate(),
            _ => return batch,
        };

        let ms_per_frame = 1000.0 / sample_rate as f32;
        batch.apply_gain(|i| {
            self.gain_at(pos_ms as f32 + i as f32 * ms_per_frame, duration_ms)
        });
        batch
    }
}
