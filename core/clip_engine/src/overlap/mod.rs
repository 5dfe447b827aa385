//! The shared timeline region of two clips and how it is mixed.

pub mod transition;

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicI64, AtomicU32, Ordering},
    },
};

use log::debug;

use crate::{
    clip::{ClipHolder, lock_clip},
    error::Result,
    overlap::transition::{AudioTransition, DefaultAudioTransition},
    source::AudioRead,
};

/// Id and window of an overlap, shared with its transition.
#[derive(Debug)]
pub struct OverlapParams {
    id: AtomicI64,
    start: AtomicI64,
    end: AtomicI64,
    /// Output rate of the front clip
    sample_rate: AtomicU32,
}

impl OverlapParams {
    pub(crate) fn new(id: i64, start: i64, end: i64, sample_rate: u32) -> Self {
        Self {
            id: AtomicI64::new(id),
            start: AtomicI64::new(start),
            end: AtomicI64::new(end),
            sample_rate: AtomicU32::new(sample_rate),
        }
    }

    pub fn id(&self) -> i64 {
        self.id.load(Ordering::Relaxed)
    }

    pub fn start(&self) -> i64 {
        self.start.load(Ordering::Relaxed)
    }

    pub fn end(&self) -> i64 {
        self.end.load(Ordering::Relaxed)
    }

    pub fn duration(&self) -> i64 {
        self.end() - self.start()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate.load(Ordering::Relaxed)
    }

    fn set_window(&self, start: i64, end: i64) {
        self.start.store(start, Ordering::Relaxed);
        self.end.store(end, Ordering::Relaxed);
    }
}

/// Timeline span of a clip, read under a single short lock.
#[derive(Debug, Clone, Copy)]
struct Span {
    start: i64,
    end: i64,
}

impl Span {
    fn of(clip: &ClipHolder) -> Self {
        let clip = lock_clip(clip);
        Self {
            start: clip.start(),
            end: clip.end(),
        }
    }

    const fn intersects(self, other: Self) -> bool {
        (self.start >= other.start && self.start < other.end)
            || (self.end > other.start && self.end <= other.end)
            || (self.start < other.start && self.end > other.end)
    }
}

/// Two clips sharing part of the timeline. The earlier-starting clip is the
/// front one; the transition decides what plays while both do.
///
/// The overlap only drives seeks and reads on its clips. Each clip is locked
/// on its own, one at a time.
#[derive(Debug)]
pub struct AudioOverlap {
    params: Arc<OverlapParams>,
    front: ClipHolder,
    rear: ClipHolder,
    transition: Box<dyn AudioTransition>,
}

impl AudioOverlap {
    pub fn new(id: i64, clip1: ClipHolder, clip2: ClipHolder) -> Self {
        let mut overlap = Self {
            params: Arc::new(OverlapParams::new(id, 0, 0, 0)),
            front: clip1,
            rear: clip2,
            transition: Box::new(DefaultAudioTransition::new()),
        };
        overlap.update();
        overlap.transition.apply_to(Arc::downgrade(&overlap.params));
        overlap
    }

    /// True when the timeline spans of `clip1` and `clip2` intersect.
    pub fn has_overlap(clip1: &ClipHolder, clip2: &ClipHolder) -> bool {
        Span::of(clip1).intersects(Span::of(clip2))
    }

    /// Re-sorts the clips by start and recomputes the window. Clips that no
    /// longer intersect leave the window at `0..0`.
    pub fn update(&mut self) {
        let mut front_span = Span::of(&self.front);
        let mut rear_span = Span::of(&self.rear);
        if front_span.start > rear_span.start {
            std::mem::swap(&mut self.front, &mut self.rear);
            std::mem::swap(&mut front_span, &mut rear_span);
        }

        if front_span.end <= rear_span.start {
            self.params.set_window(0, 0);
        } else {
            self.params
                .set_window(rear_span.start, front_span.end.min(rear_span.end));
        }
        let sample_rate = lock_clip(&self.front).out_sample_rate();
        self.params.sample_rate.store(sample_rate, Ordering::Relaxed);
        debug!("overlap updated: {self}");
    }

    pub fn params(&self) -> Arc<OverlapParams> {
        Arc::clone(&self.params)
    }

    pub fn id(&self) -> i64 {
        self.params.id()
    }

    pub fn set_id(&mut self, id: i64) {
        self.params.id.store(id, Ordering::Relaxed);
    }

    pub fn start(&self) -> i64 {
        self.params.start()
    }

    pub fn end(&self) -> i64 {
        self.params.end()
    }

    pub fn duration(&self) -> i64 {
        self.params.duration()
    }

    pub fn front_clip(&self) -> ClipHolder {
        Arc::clone(&self.front)
    }

    pub fn rear_clip(&self) -> ClipHolder {
        Arc::clone(&self.rear)
    }

    pub fn transition(&self) -> &dyn AudioTransition {
        self.transition.as_ref()
    }

    /// Binds `transition`, or the pass-through default when `None`.
    pub fn set_transition(&mut self, transition: Option<Box<dyn AudioTransition>>) {
        let mut transition: Box<dyn AudioTransition> = match transition {
            Some(transition) => transition,
            None => Box::new(DefaultAudioTransition::new()),
        };
        transition.apply_to(Arc::downgrade(&self.params));
        self.transition = transition;
    }

    /// Seeks both clips to `pos` ms into the overlap. Negative positions
    /// clamp to 0; positions past the end are ignored.
    pub fn seek_to(&mut self, pos: i64) -> Result<()> {
        if pos > self.duration() {
            return Ok(());
        }
        let pos = pos.max(0);
        let start = self.start();

        let mut front = lock_clip(&self.front);
        let front_pos = pos + (start - front.start());
        front.seek_to(front_pos)?;
        drop(front);

        let mut rear = lock_clip(&self.rear);
        let rear_pos = pos + (start - rear.start());
        rear.seek_to(rear_pos)
    }

    /// Reads the same number of frames from both clips and mixes them with
    /// the bound transition. Ends as soon as either clip ends.
    pub fn read_audio_samples(&mut self, sample_count: usize) -> Result<AudioRead> {
        let front_left = lock_clip(&self.front).left_samples();
        let rear_left = lock_clip(&self.rear).left_samples();
        let count = sample_count.min(front_left).min(rear_left);
        if count == 0 {
            let format = lock_clip(&self.front).out_format();
            return Ok(AudioRead::finished(format.sample_format, format.channels));
        }

        let front = lock_clip(&self.front).read_audio_samples(count)?;
        // a short front read (silence for drift) sets the pace for the rear
        let rear_count = match front.samples() {
            0 => count,
            n => n,
        };
        let rear = lock_clip(&self.rear).read_audio_samples(rear_count)?;

        let pos = front.batch.timestamp_ms();
        let batch = self
            .transition
            .mix_two_audio_mats(&front.batch, &rear.batch, pos);
        Ok(AudioRead::new(batch, front.eof || rear.eof))
    }
}

impl fmt::Display for AudioOverlap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'id':{}, 'start':{}, 'dur':{}}}",
            self.id(),
            self.start(),
            self.duration()
        )
    }
}

#[cfg(test)]
mod overlap_tests {
    use super::*;
    use crate::{
        clip::{AudioClip, ClipTiming, fades::FadeCurve},
        constants::AUDIO_SAMPLE_EPSILON,
        overlap::transition::CrossfadeTransition,
        source::{
            MediaParser, OutputFormat, SampleData, SampleFormat, WavMediaParser,
            scripted::{ScriptedParser, init_test_logger},
        },
    };

    const RATE: u32 = 1000;

    fn format() -> OutputFormat {
        OutputFormat::new(1, RATE, SampleFormat::F32)
    }

    fn clip(id: i64, start: i64, end: i64) -> ClipHolder {
        init_test_logger();
        let parser: Arc<dyn MediaParser> = Arc::new(ScriptedParser::new(10_000));
        AudioClip::new(id, parser, format(), ClipTiming::new(start, end, 0, 0))
            .unwrap()
            .into_shared()
    }

    fn constant_clip(id: i64, value: f32, start: i64, end: i64) -> ClipHolder {
        let frames = (end - start) as usize;
        let samples = vec![value; frames];
        let parser =
            WavMediaParser::from_raw_samples(samples, 1, RATE, "/tmp/level.wav").into_shared();
        AudioClip::new(id, parser, format(), ClipTiming::new(start, end, 0, 0))
            .unwrap()
            .into_shared()
    }

    #[test]
    fn test_has_overlap_cases() {
        assert!(AudioOverlap::has_overlap(&clip(1, 0, 100), &clip(2, 50, 150)));
        assert!(AudioOverlap::has_overlap(&clip(1, 50, 150), &clip(2, 0, 100)));
        assert!(!AudioOverlap::has_overlap(&clip(1, 0, 100), &clip(2, 100, 200)));
        assert!(AudioOverlap::has_overlap(&clip(1, 0, 200), &clip(2, 50, 100)));
        assert!(AudioOverlap::has_overlap(&clip(1, 50, 100), &clip(2, 0, 200)));
    }

    #[test]
    fn test_window_is_intersection() {
        let overlap = AudioOverlap::new(9, clip(1, 0, 100), clip(2, 50, 150));
        assert_eq!(overlap.start(), 50);
        assert_eq!(overlap.end(), 100);
        assert_eq!(overlap.duration(), 50);
        assert_eq!(overlap.to_string(), "{'id':9, 'start':50, 'dur':50}");
    }

    #[test]
    fn test_clips_are_ordered_by_start() {
        let early = clip(1, 0, 100);
        let late = clip(2, 50, 150);
        let overlap = AudioOverlap::new(1, Arc::clone(&late), Arc::clone(&early));
        assert!(Arc::ptr_eq(&overlap.front_clip(), &early));
        assert!(Arc::ptr_eq(&overlap.rear_clip(), &late));
    }

    #[test]
    fn test_contained_clip_window() {
        let overlap = AudioOverlap::new(1, clip(1, 0, 200), clip(2, 50, 100));
        assert_eq!((overlap.start(), overlap.end()), (50, 100));
    }

    #[test]
    fn test_update_collapses_when_clips_separate() {
        let rear = clip(2, 50, 150);
        let mut overlap = AudioOverlap::new(1, clip(1, 0, 100), Arc::clone(&rear));
        lock_clip(&rear).set_start(300);
        overlap.update();
        assert_eq!((overlap.start(), overlap.end()), (0, 0));
        assert_eq!(overlap.duration(), 0);

        lock_clip(&rear).set_start(80);
        overlap.update();
        assert_eq!((overlap.start(), overlap.end()), (80, 100));
    }

    #[test]
    fn test_set_id_is_visible_to_transition_params() {
        let mut overlap = AudioOverlap::new(1, clip(1, 0, 100), clip(2, 50, 150));
        let params = overlap.params();
        overlap.set_id(42);
        assert_eq!(overlap.id(), 42);
        assert_eq!(params.id(), 42);
        assert_eq!(params.sample_rate(), RATE);
    }

    #[test]
    fn test_seek_maps_into_each_clip() {
        let front = clip(1, 0, 100);
        let rear = clip(2, 50, 150);
        let mut overlap = AudioOverlap::new(1, Arc::clone(&front), Arc::clone(&rear));

        overlap.seek_to(20).unwrap();
        assert_eq!(lock_clip(&front).read_pos(), 70);
        assert_eq!(lock_clip(&rear).read_pos(), 70);

        overlap.seek_to(-10).unwrap();
        assert_eq!(lock_clip(&front).read_pos(), 50);
        assert_eq!(lock_clip(&rear).read_pos(), 50);

        // past the window: ignored
        overlap.seek_to(51).unwrap();
        assert_eq!(lock_clip(&front).read_pos(), 50);
    }

    #[test]
    fn test_read_is_limited_by_shorter_clip() {
        let mut overlap = AudioOverlap::new(1, clip(1, 0, 100), clip(2, 50, 150));
        overlap.seek_to(0).unwrap();

        let read = overlap.read_audio_samples(200).unwrap();
        // the front clip has 50 samples left, the rear 100
        assert_eq!(read.samples(), 50);
        assert!(read.eof);

        let read = overlap.read_audio_samples(10).unwrap();
        assert_eq!(read.samples(), 0);
        assert!(read.eof);
    }

    #[test]
    fn test_default_transition_plays_rear_clip() {
        let front = constant_clip(1, 1.0, 0, 100);
        let rear = constant_clip(2, 0.5, 50, 150);
        let mut overlap = AudioOverlap::new(1, front, rear);
        overlap.seek_to(0).unwrap();

        let read = overlap.read_audio_samples(10).unwrap();
        assert_eq!(read.samples(), 10);
        assert!(!read.eof);
        assert_eq!(read.batch.data(), &SampleData::F32(vec![0.5; 10]));
    }

    #[test]
    fn test_crossfade_over_window() {
        let front = constant_clip(1, 1.0, 0, 100);
        let rear = constant_clip(2, 0.0, 50, 150);
        let mut overlap = AudioOverlap::new(1, front, rear);
        overlap.set_transition(Some(Box::new(CrossfadeTransition::new(FadeCurve::Linear))));
        overlap.seek_to(0).unwrap();

        let first = overlap.read_audio_samples(25).unwrap();
        assert_eq!(first.batch.timestamp_ms(), 50);
        assert!((first.batch.data().get_f32(0).unwrap() - 1.0).abs() < AUDIO_SAMPLE_EPSILON);

        let second = overlap.read_audio_samples(25).unwrap();
        assert_eq!(second.batch.timestamp_ms(), 75);
        assert!((second.batch.data().get_f32(0).unwrap() - 0.5).abs() < AUDIO_SAMPLE_EPSILON);
        assert!(second.eof);

        overlap.set_transition(None);
        overlap.seek_to(0).unwrap();
        let read = overlap.read_audio_samples(5).unwrap();
        assert_eq!(read.batch.data(), &SampleData::F32(vec![0.0; 5]));
    }

    #[test]
    fn test_rear_keeps_reading_after_front_source_ends() {
        init_test_logger();
        // 200ms span over a 100ms source: the front runs dry half way through
        let short: Arc<dyn MediaParser> = Arc::new(ScriptedParser::new(100));
        let front = AudioClip::new(1, short, format(), ClipTiming::new(0, 200, 0, 0))
            .unwrap()
            .into_shared();
        let rear = clip(2, 50, 250);
        let mut overlap = AudioOverlap::new(1, Arc::clone(&front), Arc::clone(&rear));
        assert_eq!((overlap.start(), overlap.end()), (50, 200));
        overlap.seek_to(0).unwrap();

        let read = overlap.read_audio_samples(50).unwrap();
        assert_eq!(read.samples(), 50);
        assert!(read.eof);
        assert!(lock_clip(&front).is_eof());

        let read = overlap.read_audio_samples(20).unwrap();
        assert!(read.eof);
        assert_eq!(read.samples(), 20);
        assert_eq!(read.batch.data().get_f32(0), Some(50.0));
        assert_eq!(lock_clip(&rear).read_pos(), 120);
    }

    #[test]
    fn test_overlap_of_clip_with_itself_does_not_deadlock() {
        let shared = clip(1, 0, 100);
        let mut overlap = AudioOverlap::new(1, Arc::clone(&shared), shared);
        assert_eq!(overlap.duration(), 100);
        overlap.seek_to(10).unwrap();
        let read = overlap.read_audio_samples(4).unwrap();
        assert_eq!(read.samples(), 4);
    }
}
