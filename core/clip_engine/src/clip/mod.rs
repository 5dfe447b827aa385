//! A trimmed, timeline-placed view of one decoded source.
//!
//! Three coordinate spaces meet here: timeline ms (`start`..`end`),
//! clip-local ms (`0..duration`) and source ms (`start_offset +` clip-local).
//! The read loop keeps the clip's sample counter and the reader's own
//! position within [`ClipSettings::max_mismatch_samples`] of each other.

pub mod fades;
pub mod filter;
pub mod params;

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, warn};
use transport::{
    PlayDirection, SampleCursor,
    time::{ms_to_samples, samples_to_ms, secs_to_ms},
};

use crate::{
    clip::{filter::AudioFilter, params::ClipParams},
    config::ClipSettings,
    error::{ClipError, Result},
    source::{AudioBatch, AudioRead, MediaParser, OutputFormat, SourceReader},
};

/// Shared handle to a clip. A clip may sit on a track and in any number of
/// overlaps at once; the longest-lived holder keeps it alive.
pub type ClipHolder = Arc<Mutex<AudioClip>>;

/// Locks a shared clip, recovering the guard if a previous holder panicked.
pub fn lock_clip(clip: &ClipHolder) -> MutexGuard<'_, AudioClip> {
    clip.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Requested placement of a clip: the timeline span it should cover and how
/// much of the source to trim from the head and tail (all in ms).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipTiming {
    pub start: i64,
    pub end: i64,
    pub start_offset: i64,
    pub end_offset: i64,
}

impl ClipTiming {
    pub const fn new(start: i64, end: i64, start_offset: i64, end_offset: i64) -> Self {
        Self {
            start,
            end,
            start_offset,
            end_offset,
        }
    }
}

#[derive(Debug)]
pub struct AudioClip {
    params: Arc<ClipParams>,
    parser: Arc<dyn MediaParser>,
    reader: Box<dyn SourceReader>,
    out_format: OutputFormat,
    settings: ClipSettings,
    filter: Option<Box<dyn AudioFilter>>,
    /// Progress through the trimmed region, in output samples
    cursor: SampleCursor,
    /// Bytes per output frame, cached on first read
    frame_size: usize,
    eof: bool,
    initial_seek_done: bool,
    /// Short label for log lines
    label: String,
}

impl AudioClip {
    pub fn new(
        id: i64,
        parser: Arc<dyn MediaParser>,
        out_format: OutputFormat,
        timing: ClipTiming,
    ) -> Result<Self> {
        Self::with_settings(id, parser, out_format, timing, ClipSettings::default())
    }

    pub fn with_settings(
        id: i64,
        parser: Arc<dyn MediaParser>,
        out_format: OutputFormat,
        timing: ClipTiming,
        settings: ClipSettings,
    ) -> Result<Self> {
        if parser.best_audio_stream_index().is_none() {
            return Err(ClipError::invalid(format!(
                "media '{}' has NO audio stream",
                parser.url()
            )));
        }

        let mut reader = parser.create_reader();
        reader
            .open(Arc::clone(&parser))
            .map_err(ClipError::reader("open"))?;
        reader
            .config_audio_reader(out_format)
            .map_err(ClipError::reader("configure"))?;

        let stream = reader.audio_stream().ok_or_else(|| {
            ClipError::invalid(format!("media '{}' has NO audio stream", parser.url()))
        })?;
        let src_duration = secs_to_ms(stream.duration_secs);

        let ClipTiming {
            start,
            end,
            start_offset,
            end_offset,
        } = timing;
        if start_offset < 0 {
            return Err(ClipError::invalid("'start_offset' can NOT be NEGATIVE"));
        }
        if end_offset < 0 {
            return Err(ClipError::invalid("'end_offset' can NOT be NEGATIVE"));
        }
        if end <= start {
            return Err(ClipError::invalid(format!(
                "clip span [{start}, {end}) is NOT LARGER than 0"
            )));
        }
        if start_offset + end_offset >= src_duration {
            return Err(ClipError::invalid(format!(
                "offsets {start_offset}+{end_offset} consume the whole source ({src_duration}ms)"
            )));
        }

        let padding = (end - start) + start_offset + end_offset - src_duration;
        let params = Arc::new(ClipParams::new(
            id,
            start,
            start_offset,
            end_offset,
            src_duration,
            padding,
            out_format.sample_rate,
        ));
        let total_samples = ms_to_samples(params.duration(), out_format.sample_rate);

        reader.start().map_err(ClipError::reader("start"))?;

        Ok(Self {
            label: clip_label(id, parser.url()),
            params,
            parser,
            reader,
            out_format,
            settings,
            filter: None,
            cursor: SampleCursor::new(total_samples),
            frame_size: 0,
            eof: false,
            initial_seek_done: false,
        })
    }

    pub fn into_shared(self) -> ClipHolder {
        Arc::new(Mutex::new(self))
    }

    /// A new clip over the same source with the same id, placement, trim, track
    /// and settings, decoding to `out_format`. Read progress and filter are not
    /// carried over.
    pub fn clone_with_format(&self, out_format: OutputFormat) -> Result<Self> {
        let timing = ClipTiming::new(
            self.start(),
            self.end(),
            self.start_offset(),
            self.end_offset(),
        );
        let clip = Self::with_settings(
            self.id(),
            Arc::clone(&self.parser),
            out_format,
            timing,
            self.settings,
        )?;
        clip.params.set_track_id(self.track_id());
        Ok(clip)
    }

    pub fn media_parser(&self) -> Arc<dyn MediaParser> {
        Arc::clone(&self.parser)
    }

    pub fn params(&self) -> Arc<ClipParams> {
        Arc::clone(&self.params)
    }

    pub const fn settings(&self) -> &ClipSettings {
        &self.settings
    }

    pub fn id(&self) -> i64 {
        self.params.id()
    }

    pub fn track_id(&self) -> Option<i64> {
        self.params.track_id()
    }

    pub fn start(&self) -> i64 {
        self.params.start()
    }

    pub fn end(&self) -> i64 {
        self.params.end()
    }

    pub fn start_offset(&self) -> i64 {
        self.params.start_offset()
    }

    pub fn end_offset(&self) -> i64 {
        self.params.end_offset()
    }

    pub fn duration(&self) -> i64 {
        self.params.duration()
    }

    /// Timeline position (ms) the next read starts from.
    pub fn read_pos(&self) -> i64 {
        samples_to_ms(self.cursor.read(), self.reader.out_sample_rate()) + self.start()
    }

    pub fn out_channels(&self) -> u32 {
        self.reader.out_channels()
    }

    pub fn out_sample_rate(&self) -> u32 {
        self.reader.out_sample_rate()
    }

    pub const fn out_format(&self) -> OutputFormat {
        self.out_format
    }

    pub fn direction(&self) -> PlayDirection {
        self.reader.direction()
    }

    /// Samples left before the clip boundary in the current direction.
    pub fn left_samples(&self) -> usize {
        self.cursor.left(self.reader.direction())
    }

    pub const fn is_eof(&self) -> bool {
        self.eof
    }

    pub fn set_track_id(&mut self, track_id: Option<i64>) {
        self.params.set_track_id(track_id);
    }

    /// Moves the clip on the timeline. Trim and read progress are untouched.
    pub fn set_start(&mut self, start: i64) {
        self.params.set_start(start);
    }

    /// Re-trims the head. The reader's absolute source position is kept, so
    /// the next read continues from the same source sample.
    pub fn change_start_offset(&mut self, start_offset: i64) -> Result<()> {
        if start_offset == self.start_offset() {
            return Ok(());
        }
        if start_offset < 0 {
            return Err(ClipError::invalid("'start_offset' can NOT be NEGATIVE"));
        }
        self.check_trim(start_offset, self.end_offset())?;

        self.params.set_start_offset(start_offset);
        let total = self.total_samples();
        self.cursor.shift(total - self.cursor.total());
        self.cursor.set_total(total);
        Ok(())
    }

    /// Re-trims the tail. The read position is relative to the head, so only
    /// the total changes.
    pub fn change_end_offset(&mut self, end_offset: i64) -> Result<()> {
        if end_offset == self.end_offset() {
            return Ok(());
        }
        if end_offset < 0 {
            return Err(ClipError::invalid("'end_offset' can NOT be NEGATIVE"));
        }
        self.check_trim(self.start_offset(), end_offset)?;

        self.params.set_end_offset(end_offset);
        let total = self.total_samples();
        self.cursor.set_total(total);
        Ok(())
    }

    fn check_trim(&self, start_offset: i64, end_offset: i64) -> Result<()> {
        if start_offset + end_offset >= self.params.src_duration()
            || self.params.duration_with(start_offset, end_offset) <= 0
        {
            return Err(ClipError::invalid(format!(
                "offsets {start_offset}+{end_offset} leave NO clip duration"
            )));
        }
        Ok(())
    }

    fn total_samples(&self) -> i64 {
        ms_to_samples(self.duration(), self.reader.out_sample_rate())
    }

    /// Seeks to `pos` ms into the clip (`0..=duration`). Out-of-range
    /// positions are logged and ignored.
    pub fn seek_to(&mut self, pos: i64) -> Result<()> {
        let duration = self.duration();
        if pos < 0 || pos > duration {
            warn!(
                "{}: INVALID seek, pos={pos} is out of the valid range [0, {duration}]",
                self.label
            );
            return Ok(());
        }

        let target = ms_to_samples(pos, self.reader.out_sample_rate());
        if target == self.cursor.read() {
            return Ok(());
        }

        let seek_pos = (pos + self.start_offset()).min(self.params.src_duration());
        debug!("{}: seek source to {seek_pos}ms", self.label);
        self.reader
            .seek_to(seek_pos)
            .map_err(ClipError::reader("seek"))?;
        self.cursor.set_read(target);
        self.eof = false;
        Ok(())
    }

    /// Reads up to `sample_count` frames from the current position.
    ///
    /// The batch timestamp is the timeline position of its first frame. When
    /// the reader has drifted more than the mismatch tolerance from where the
    /// clip expects it, this read instead returns silence (reader ahead) or
    /// first discards the gap (reader behind).
    pub fn read_audio_samples(&mut self, sample_count: usize) -> Result<AudioRead> {
        let left = self.left_samples();
        if self.eof || left == 0 {
            self.eof = true;
            return Ok(AudioRead::finished(
                self.out_format.sample_format,
                self.out_format.channels,
            ));
        }
        let count = sample_count.min(left);

        let sample_rate = self.reader.out_sample_rate();
        if self.frame_size == 0 {
            self.frame_size = self.reader.out_frame_size();
        }

        let start_offset = self.start_offset();
        let expected_pos = samples_to_ms(self.cursor.read(), sample_rate) + start_offset;
        if !self.initial_seek_done {
            if expected_pos > self.settings.initial_seek_threshold_ms {
                if let Err(e) = self.reader.seek_to(expected_pos) {
                    warn!(
                        "{}: initial seek to {expected_pos}ms failed: {e}",
                        self.label
                    );
                }
            }
            self.initial_seek_done = true;
        }

        let timeline_pos = expected_pos - start_offset + self.start();
        let source_pos = self.reader.read_pos();
        let direction = self.reader.direction();
        let mut diff = ms_to_samples((source_pos - expected_pos).abs(), sample_rate);
        // reader lagging behind in its own direction: skip ahead by reading
        let mut lagging = false;
        if diff > self.settings.max_mismatch_samples {
            debug!(
                "{}: expected read pos {expected_pos} != source pos {source_pos}, diff={diff}",
                self.label
            );
            lagging = (expected_pos > source_pos) == direction.is_forward();
        } else {
            diff = 0;
        }

        let mut src_eof = false;
        let mut batch = None;
        if diff > 0 {
            if lagging {
                if diff > i64::from(sample_rate) {
                    warn!("{}: skip sample count {diff} is TOO LARGE", self.label);
                }
                let skipped = self
                    .reader
                    .read_audio_samples(diff as usize)
                    .map_err(ClipError::reader("read"))?;
                src_eof = skipped.eof;
                debug!(
                    "{}: skipped {} of {diff} samples, src_eof={src_eof}",
                    self.label,
                    skipped.samples()
                );
            } else {
                let silence = (diff as usize).min(count);
                debug!("{}: return {silence} samples of silence", self.label);
                let sample_format = self.out_format.sample_format;
                let channels = self.frame_size / sample_format.bytes_per_sample();
                batch = Some(AudioBatch::silence(
                    sample_format,
                    channels as u32,
                    silence,
                    timeline_pos,
                ));
            }
        }

        let mut batch = match batch {
            Some(batch) => batch,
            None => {
                let read = self
                    .reader
                    .read_audio_samples(count)
                    .map_err(ClipError::reader("read"))?;
                src_eof |= read.eof;
                let mut batch = read.batch;
                if !batch.is_empty() {
                    let actual_pos = batch.timestamp_ms();
                    let drift = ms_to_samples((actual_pos - expected_pos).abs(), sample_rate);
                    if drift > self.settings.max_mismatch_samples {
                        debug!(
                            "{}: batch pos {actual_pos} != expected {expected_pos}, diff={drift}",
                            self.label
                        );
                    }
                }
                batch.set_timestamp_ms(timeline_pos);
                batch
            }
        };

        let samples = batch.frames();
        self.cursor.advance(samples, direction);
        if self.left_samples() == 0 || src_eof {
            self.eof = true;
        }

        if samples > 0 {
            if let Some(filter) = self.filter.as_mut() {
                let pos = batch.timestamp_ms() - self.params.start();
                batch = filter.filter_pcm(batch, pos, self.params.duration());
            }
        }
        Ok(AudioRead::new(batch, self.eof))
    }

    pub fn set_direction(&mut self, direction: PlayDirection) {
        self.reader.set_direction(direction);
    }

    /// Attaches `filter` (binding it to this clip) or detaches the current one.
    pub fn set_filter(&mut self, filter: Option<Box<dyn AudioFilter>>) {
        self.filter = filter.map(|mut filter| {
            filter.apply_to(Arc::downgrade(&self.params));
            filter
        });
    }

    pub fn filter(&self) -> Option<&dyn AudioFilter> {
        self.filter.as_deref()
    }

    pub fn filter_mut(&mut self) -> Option<&mut (dyn AudioFilter + 'static)> {
        self.filter.as_deref_mut()
    }
}

impl fmt::Display for AudioClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{'id':{}, 'start':{}, 'dur':{}, 'soff':{}, 'eoff':{}}}",
            self.id(),
            self.start(),
            self.duration(),
            self.start_offset(),
            self.end_offset()
        )
    }
}

/// "AClp-<first 4 chars of file name>-<last 4 digits of id>"
fn clip_label(id: i64, url: &str) -> String {
    let file_name = url.rsplit(['/', '\\']).next().unwrap_or(url);
    let file_prefix: String = file_name.chars().take(4).collect();
    let id = id.to_string();
    let id_suffix = &id[id.len().saturating_sub(4)..];
    format!("AClp-{file_prefix}-{id_suffix}")
}
