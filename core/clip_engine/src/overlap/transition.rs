use std::{
    fmt,
    sync::{Arc, Weak},
};

use crate::{clip::fades::FadeCurve, overlap::OverlapParams, source::AudioBatch};

/// Mixing strategy for the shared region of two clips.
pub trait AudioTransition: Send + fmt::Debug {
    /// Called when the transition is bound to an overlap. The reference is to
    /// the overlap's parameters and is only valid while the overlap lives.
    fn apply_to(&mut self, overlap: Weak<OverlapParams>);

    /// Produces one batch from two time-aligned batches. `pos_ms` is the
    /// timeline position of the front batch.
    fn mix_two_audio_mats(
        &mut self,
        front: &AudioBatch,
        rear: &AudioBatch,
        pos_ms: i64,
    ) -> AudioBatch;
}

/// Hard cut: the rear clip replaces the front for the whole overlap.
#[derive(Debug, Default)]
pub struct DefaultAudioTransition {
    overlap: Weak<OverlapParams>,
}

impl DefaultAudioTransition {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn overlap(&self) -> Option<Arc<OverlapParams>> {
        self.overlap.upgrade()
    }
}

impl AudioTransition for DefaultAudioTransition {
    fn apply_to(&mut self, overlap: Weak<OverlapParams>) {
        self.overlap = overlap;
    }

    fn mix_two_audio_mats(
        &mut self,
        _front: &AudioBatch,
        rear: &AudioBatch,
        _pos_ms: i64,
    ) -> AudioBatch {
        rear.clone()
    }
}

/// Fades the front clip out while the rear fades in across the overlap.
#[derive(Debug, Default)]
pub struct CrossfadeTransition {
    curve: FadeCurve,
    overlap: Weak<OverlapParams>,
}

impl CrossfadeTransition {
    pub fn new(curve: FadeCurve) -> Self {
        Self {
            curve,
            overlap: Weak::new(),
        }
    }

    pub const fn curve(&self) -> FadeCurve {
        self.curve
    }
}

impl AudioTransition for CrossfadeTransition {
    fn apply_to(&mut self, overlap: Weak<OverlapParams>) {
        self.overlap = overlap;
    }

    fn mix_two_audio_mats(
        &mut self,
        front: &AudioBatch,
        rear: &AudioBatch,
        pos_ms: i64,
    ) -> AudioBatch {
        let Some(params) = self.overlap.upgrade() else {
            return rear.clone();
        };
        let duration = params.duration();
        let sample_rate = params.sample_rate();
        if duration <= 0 || sample_rate == 0 {
            return rear.clone();
        }

        let offset_ms = (pos_ms - params.start()) as f32;
        let ms_per_frame = 1000.0 / sample_rate as f32;
        let curve = self.curve;
        front.mix_with(rear, |i| {
            let t = (offset_ms + i as f32 * ms_per_frame) / duration as f32;
            (curve.fade_out(t), curve.fade_in(t))
        })
    }
}
