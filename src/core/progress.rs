// ─── Progress ───
// Contract between the bootstrap pipeline and whatever displays it.
//
// Every update carries two numbers: the percent of the current operation
// (stage) and the percent of the whole provision → update → launch sequence
// (overall). Each operation owns a fixed slice of the overall range.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

/// Receives progress from the pipeline. Called from worker tasks, never from
/// the thread that owns the display; implementations must hand the values
/// over (e.g. post an event) rather than touch display state directly.
pub trait ProgressSink: Send + Sync {
    fn report_progress(&self, stage_percent: u8, overall_percent: u8, text: &str);
    fn report_error(&self, text: &str);
}

/// A fixed sub-range of overall progress owned by one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSlice {
    start: u8,
    end: u8,
}

impl ProgressSlice {
    pub const fn new(start: u8, end: u8) -> Self {
        Self { start, end }
    }

    pub fn start(self) -> u8 {
        self.start
    }

    pub fn end(self) -> u8 {
        self.end
    }

    /// Map a stage percent (clamped to 0..=100) into this slice.
    pub fn map(self, stage_percent: u8) -> u8 {
        let stage = u32::from(stage_percent.min(100));
        let width = u32::from(self.end - self.start);
        self.start + (stage * width / 100) as u8
    }
}

pub const RUNTIME_DOWNLOAD: ProgressSlice = ProgressSlice::new(0, 25);
pub const RUNTIME_EXTRACT: ProgressSlice = ProgressSlice::new(25, 40);
pub const UPDATE_DOWNLOAD: ProgressSlice = ProgressSlice::new(40, 65);
/// Overall percent held while waiting for the client's handshake.
pub const LAUNCH_PENDING: u8 = 99;
pub const COMPLETE: u8 = 100;

/// Wraps a [`ProgressSink`] and guarantees the values it forwards never
/// regress: overall is non-decreasing for the whole run, stage is
/// non-decreasing until the next [`ProgressReporter::stage`] call.
#[derive(Clone)]
pub struct ProgressReporter {
    sink: Arc<dyn ProgressSink>,
    overall: Arc<AtomicU8>,
    stage: Arc<AtomicU8>,
}

impl ProgressReporter {
    pub fn new(sink: Arc<dyn ProgressSink>) -> Self {
        Self {
            sink,
            overall: Arc::new(AtomicU8::new(0)),
            stage: Arc::new(AtomicU8::new(0)),
        }
    }

    /// Begin a new operation occupying `slice` of overall progress.
    pub fn stage(&self, slice: ProgressSlice) -> StageProgress {
        self.stage.store(0, Ordering::SeqCst);
        StageProgress {
            reporter: self.clone(),
            slice,
        }
    }

    pub fn report(&self, stage_percent: u8, overall_percent: u8, text: &str) {
        let stage = clamp_max(&self.stage, stage_percent);
        let overall = clamp_max(&self.overall, overall_percent);
        self.sink.report_progress(stage, overall, text);
    }

    /// Same as [`report`](Self::report) but starts a fresh stage first, so a
    /// new operation can show a lower stage percent than the previous one.
    pub fn report_new_stage(&self, stage_percent: u8, overall_percent: u8, text: &str) {
        self.stage.store(0, Ordering::SeqCst);
        self.report(stage_percent, overall_percent, text);
    }

    pub fn error(&self, text: &str) {
        self.sink.report_error(text);
    }
}

fn clamp_max(slot: &AtomicU8, value: u8) -> u8 {
    let value = value.min(100);
    let previous = slot.fetch_max(value, Ordering::SeqCst);
    previous.max(value)
}

/// Progress handle for one operation; maps stage percent into its slice.
#[derive(Clone)]
pub struct StageProgress {
    reporter: ProgressReporter,
    slice: ProgressSlice,
}

impl StageProgress {
    pub fn update(&self, stage_percent: u8, text: &str) {
        self.reporter
            .report(stage_percent, self.slice.map(stage_percent), text);
    }

    pub fn finish(&self, text: &str) {
        self.update(100, text);
    }

    pub fn slice(&self) -> ProgressSlice {
        self.slice
    }
}

/// Event form of a sink call, for displays that live on another thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Progress {
        stage_percent: u8,
        overall_percent: u8,
        text: String,
    },
    Error {
        text: String,
    },
}

/// Sink that posts every call onto an event queue.
pub struct ChannelSink {
    tx: UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new(tx: UnboundedSender<ProgressEvent>) -> Self {
        Self { tx }
    }
}

impl ProgressSink for ChannelSink {
    fn report_progress(&self, stage_percent: u8, overall_percent: u8, text: &str) {
        // A closed receiver means the display is gone; nothing left to update.
        let _ = self.tx.send(ProgressEvent::Progress {
            stage_percent,
            overall_percent,
            text: text.to_string(),
        });
    }

    fn report_error(&self, text: &str) {
        let _ = self.tx.send(ProgressEvent::Error {
            text: text.to_string(),
        });
    }
}
