//! Millisecond <-> sample conversion. All positions in the engine are integer
//! milliseconds; conversions truncate toward zero.

pub const MILLIS_PER_SECOND: i64 = 1000;

pub fn ms_to_samples(ms: i64, sample_rate: u32) -> i64 {
    ms * i64::from(sample_rate) / MILLIS_PER_SECOND
}

pub fn samples_to_ms(samples: i64, sample_rate: u32) -> i64 {
    if sample_rate == 0 {
        return 0;
    }
    samples * MILLIS_PER_SECOND / i64::from(sample_rate)
}

/// Decoders report stream length in float seconds; round to the nearest ms.
pub fn secs_to_ms(secs: f64) -> i64 {
    (secs * MILLIS_PER_SECOND as f64).round() as i64
}
