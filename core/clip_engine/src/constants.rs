/// Largest gap, in output samples, tolerated between where a clip expects its
/// reader to be and where the reader reports it is.
pub const MAX_ALLOWED_MISMATCH_SAMPLES: i64 = 200;

/// On the first read, a clip whose expected source position lies beyond this
/// point seeks the reader there instead of correcting drift read by read.
pub const INITIAL_SEEK_THRESHOLD_MS: i64 = 1000;

/// Stored track id of a clip not yet placed on a track.
pub const UNASSIGNED_TRACK_ID: i64 = -1;

#[cfg(test)]
pub const AUDIO_SAMPLE_EPSILON: f32 = 1e-4;
