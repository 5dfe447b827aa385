use std::f32::consts::FRAC_PI_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FadeCurve {
    #[default]
    Linear,
    EqualPower,
}

impl FadeCurve {
    /// Gain rising from 0.0 to 1.0 as `t` goes from 0.0 to 1.0.
    pub fn fade_in(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::EqualPower => (t * FRAC_PI_2).sin(),
        }
    }

    /// Gain falling from 1.0 to 0.0 as `t` goes from 0.0 to 1.0.
    pub fn fade_out(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => 1.0 - t,
            Self::EqualPower => (t * FRAC_PI_2).cos(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fade {
    pub length_ms: i64,
    pub curve: FadeCurve,
}

impl Fade {
    pub const fn none() -> Self {
        Self {
            length_ms: 0,
            curve: FadeCurve::Linear,
        }
    }

    pub const fn new(length_ms: i64, curve: FadeCurve) -> Self {
        Self { length_ms, curve }
    }

    pub const fn is_none(&self) -> bool {
        self.length_ms <= 0
    }
}
