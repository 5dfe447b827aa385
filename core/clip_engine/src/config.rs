use crate::constants::{INITIAL_SEEK_THRESHOLD_MS, MAX_ALLOWED_MISMATCH_SAMPLES};

/// Tunables of a clip's read loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipSettings {
    /// Drift (in output samples) between expected and reported reader
    /// position above which the clip inserts silence or skips samples.
    pub max_mismatch_samples: i64,
    /// Expected source position (ms) beyond which the first read seeks.
    pub initial_seek_threshold_ms: i64,
}

impl Default for ClipSettings {
    fn default() -> Self {
        Self {
            max_mismatch_samples: MAX_ALLOWED_MISMATCH_SAMPLES,
            initial_seek_threshold_ms: INITIAL_SEEK_THRESHOLD_MS,
        }
    }
}

impl ClipSettings {
    pub const fn with_max_mismatch_samples(mut self, samples: i64) -> Self {
        self.max_mismatch_samples = samples;
        self
    }

    pub const fn with_initial_seek_threshold_ms(mut self, ms: i64) -> Self {
        self.initial_seek_threshold_ms = ms;
        self
    }
}

#[cfg(test)]
mod settings_tests {
    use super::*;

    #[test]
    fn default_settings_use_engine_constants() {
        let settings = ClipSettings::default();
        assert_eq!(settings.max_mismatch_samples, 200);
        assert_eq!(settings.initial_seek_threshold_ms, 1000);
    }

    #[test]
    fn builders_override_single_fields() {
        let settings = ClipSettings::default().with_max_mismatch_samples(10);
        assert_eq!(settings.max_mismatch_samples, 10);
        assert_eq!(settings.initial_seek_threshold_ms, 1000);

        let settings = settings.with_initial_seek_threshold_ms(0);
        assert_eq!(settings.initial_seek_threshold_ms, 0);
    }
}
