use std::sync::atomic::{AtomicI64, Ordering};

use crate::constants::UNASSIGNED_TRACK_ID;

/// Timeline placement and trim of a clip, shared with whatever is bound to
/// the clip (filters) so they can query it without borrowing the clip.
///
/// The owning clip is the only writer.
#[derive(Debug)]
pub struct ClipParams {
    id: i64,
    track_id: AtomicI64,
    start: AtomicI64,
    start_offset: AtomicI64,
    end_offset: AtomicI64,
    /// Stream length reported by the reader (ms)
    src_duration: i64,
    /// `(end - start) + start_offset + end_offset - src_duration` at creation
    padding: i64,
    out_sample_rate: u32,
}

impl ClipParams {
    pub(crate) fn new(
        id: i64,
        start: i64,
        start_offset: i64,
        end_offset: i64,
        src_duration: i64,
        padding: i64,
        out_sample_rate: u32,
    ) -> Self {
        Self {
            id,
            track_id: AtomicI64::new(UNASSIGNED_TRACK_ID),
            start: AtomicI64::new(start),
            start_offset: AtomicI64::new(start_offset),
            end_offset: AtomicI64::new(end_offset),
            src_duration,
            padding,
            out_sample_rate,
        }
    }

    pub const fn id(&self) -> i64 {
        self.id
    }

    pub fn track_id(&self) -> Option<i64> {
        let id = self.track_id.load(Ordering::Relaxed);
        (id != UNASSIGNED_TRACK_ID).then_some(id)
    }

    pub fn start(&self) -> i64 {
        self.start.load(Ordering::Relaxed)
    }

    pub fn end(&self) -> i64 {
        self.start() + self.duration()
    }

    pub fn start_offset(&self) -> i64 {
        self.start_offset.load(Ordering::Relaxed)
    }

    pub fn end_offset(&self) -> i64 {
        self.end_offset.load(Ordering::Relaxed)
    }

    pub const fn src_duration(&self) -> i64 {
        self.src_duration
    }

    pub const fn padding(&self) -> i64 {
        self.padding
    }

    /// Trimmed length on the timeline (ms).
    pub fn duration(&self) -> i64 {
        self.duration_with(self.start_offset(), self.end_offset())
    }

    pub(crate) const fn duration_with(&self, start_offset: i64, end_offset: i64) -> i64 {
        self.src_duration + self.padding - start_offset - end_offset
    }

    pub const fn out_sample_rate(&self) -> u32 {
        self.out_sample_rate
    }

    pub(crate) fn set_track_id(&self, track_id: Option<i64>) {
        self.track_id
            .store(track_id.unwrap_or(UNASSIGNED_TRACK_ID), Ordering::Relaxed);
    }

    pub(crate) fn set_start(&self, start: i64) {
        self.start.store(start, Ordering::Relaxed);
    }

    pub(crate) fn set_start_offset(&self, start_offset: i64) {
        self.start_offset.store(start_offset, Ordering::Relaxed);
    }

    pub(crate) fn set_end_offset(&self, end_offset: i64) {
        self.end_offset.store(end_offset, Ordering::Relaxed);
    }
}
