//! A synthetic reader for tests: produces a ramp (sample value = output
//! frame index) and lets the test move the decoder position, coarsen seeks
//! and inject failures.

use std::sync::{
    Arc, Mutex,
    atomic::{AtomicI64, Ordering},
};

use transport::{
    PlayDirection,
    time::{ms_to_samples, samples_to_ms},
};

use crate::source::{
    AudioBatch, AudioRead, AudioStreamInfo, MediaParser, OutputFormat, SampleData, SourceError,
    SourceReader,
};

/// Routes `log` output through the test harness's captured stdout.
pub(crate) fn init_test_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// State shared between a test and the readers it scripts.
#[derive(Debug, Default)]
pub(crate) struct ReaderScript {
    /// Decoder position in output frames
    pub position: AtomicI64,
    /// Seeks land on the lower multiple of this (0 = exact)
    pub seek_granularity_ms: AtomicI64,
    pub fail_op: Mutex<Option<&'static str>>,
    pub seeks: Mutex<Vec<i64>>,
    pub reads: Mutex<Vec<usize>>,
}

impl ReaderScript {
    pub fn fail_on(&self, op: &'static str) {
        *self.fail_op.lock().unwrap() = Some(op);
    }

    pub fn seeks(&self) -> Vec<i64> {
        self.seeks.lock().unwrap().clone()
    }

    pub fn reads(&self) -> Vec<usize> {
        self.reads.lock().unwrap().clone()
    }

    pub fn position(&self) -> i64 {
        self.position.load(Ordering::Relaxed)
    }

    pub fn set_position(&self, frames: i64) {
        self.position.store(frames, Ordering::Relaxed);
    }

    pub fn set_seek_granularity(&self, ms: i64) {
        self.seek_granularity_ms.store(ms, Ordering::Relaxed);
    }

    fn check(&self, op: &'static str) -> Result<(), SourceError> {
        if *self.fail_op.lock().unwrap() == Some(op) {
            return Err(format!("scripted {op} failure").into());
        }
        Ok(())
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedParser {
    pub url: String,
    pub duration_ms: i64,
    pub has_audio: bool,
    pub script: Arc<ReaderScript>,
}

impl ScriptedParser {
    pub fn new(duration_ms: i64) -> Self {
        Self {
            url: "/media/scripted.wav".to_owned(),
            duration_ms,
            has_audio: true,
            script: Arc::new(ReaderScript::default()),
        }
    }
}

impl MediaParser for ScriptedParser {
    fn url(&self) -> &str {
        &self.url
    }

    fn best_audio_stream_index(&self) -> Option<usize> {
        self.has_audio.then_some(0)
    }

    fn create_reader(&self) -> Box<dyn SourceReader> {
        // a fresh reader starts at the head of the stream
        self.script.set_position(0);
        Box::new(ScriptedReader {
            script: Arc::clone(&self.script),
            duration_ms: self.duration_ms,
            opened: false,
            format: None,
            direction: PlayDirection::Forward,
        })
    }
}

#[derive(Debug)]
pub(crate) struct ScriptedReader {
    script: Arc<ReaderScript>,
    duration_ms: i64,
    opened: bool,
    format: Option<OutputFormat>,
    direction: PlayDirection,
}

impl ScriptedReader {
    fn format(&self) -> Result<OutputFormat, SourceError> {
        self.format.ok_or_else(|| "scripted reader is not configured".into())
    }
}

impl SourceReader for ScriptedReader {
    fn open(&mut self, _parser: Arc<dyn MediaParser>) -> Result<(), SourceError> {
        self.script.check("open")?;
        self.opened = true;
        Ok(())
    }

    fn config_audio_reader(&mut self, format: OutputFormat) -> Result<(), SourceError> {
        self.script.check("configure")?;
        if !self.opened {
            return Err("scripted reader is not opened".into());
        }
        self.format = Some(format);
        Ok(())
    }

    fn start(&mut self) -> Result<(), SourceError> {
        self.script.check("start")
    }

    fn seek_to(&mut self, pos_ms: i64) -> Result<(), SourceError> {
        self.script.check("seek")?;
        let format = self.format()?;
        self.script.seeks.lock().unwrap().push(pos_ms);
        let granularity = self.script.seek_granularity_ms.load(Ordering::Relaxed);
        let landed = if granularity > 0 {
            pos_ms / granularity * granularity
        } else {
            pos_ms
        };
        let position = ms_to_samples(landed.clamp(0, self.duration_ms), format.sample_rate);
        self.script.set_position(position);
        Ok(())
    }

    fn read_audio_samples(&mut self, sample_count: usize) -> Result<AudioRead, SourceError> {
        self.script.check("read")?;
        let format = self.format()?;
        self.script.reads.lock().unwrap().push(sample_count);

        let total = ms_to_samples(self.duration_ms, format.sample_rate);
        let position = self.script.position();
        let count = sample_count as i64;
        let frames: Vec<i64> = match self.direction {
            PlayDirection::Forward => (position..(position + count).min(total)).collect(),
            PlayDirection::Reverse => ((position - count).max(0)..position).rev().collect(),
        };

        let channels = format.channels as usize;
        let samples = frames
            .iter()
            .flat_map(|frame| std::iter::repeat_n(*frame as f32, channels))
            .collect();
        let moved = frames.len() as i64 * self.direction.signum();
        self.script.set_position(position + moved);

        let eof = match self.direction {
            PlayDirection::Forward => position + moved >= total,
            PlayDirection::Reverse => position + moved <= 0,
        };
        let batch = AudioBatch::new(
            SampleData::from_f32(format.sample_format, samples),
            format.channels,
            samples_to_ms(position, format.sample_rate),
        );
        Ok(AudioRead::new(batch, eof))
    }

    fn read_pos(&self) -> i64 {
        self.format
            .map_or(0, |f| samples_to_ms(self.script.position(), f.sample_rate))
    }

    fn direction(&self) -> PlayDirection {
        self.direction
    }

    fn set_direction(&mut self, direction: PlayDirection) {
        self.direction = direction;
    }

    fn out_sample_rate(&self) -> u32 {
        self.format.map_or(0, |f| f.sample_rate)
    }

    fn out_channels(&self) -> u32 {
        self.format.map_or(0, |f| f.channels)
    }

    fn out_frame_size(&self) -> usize {
        self.format.map_or(0, |f| f.frame_size())
    }

    fn audio_stream(&self) -> Option<AudioStreamInfo> {
        Some(AudioStreamInfo {
            duration_secs: self.duration_ms as f64 / 1000.0,
            sample_rate: self.format.map_or(0, |f| f.sample_rate),
            channels: self.format.map_or(0, |f| f.channels),
        })
    }
}
