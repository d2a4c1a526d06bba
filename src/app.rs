// src/app.rs - Frame loop: source -> detector -> resolver -> CSV
use crate::data::{CsvSink, OutputRow};
use crate::error::TrackerError;
use crate::landmarks::{validate_frame, DetectedHand, RawHand};
use crate::mediapipe_bridge::HandLandmarker;
use crate::tracking::{resolve, Presence};
use crate::ui::OverlayWriter;
use crate::video::FrameSource;
use anyhow::Result;
use image::DynamicImage;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Ready,
    ProcessingFrame,
    RowPersisted,
    Finished,
}

#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub frames: u64,
    pub both: u64,
    pub left: u64,
    pub right: u64,
    pub no_hands: u64,
    pub malformed: u64,
    pub aborted: bool,
    pub elapsed: Duration,
    pub output: PathBuf,
}

impl RunSummary {
    fn record(&mut self, presence: Presence) {
        self.frames += 1;
        match presence {
            Presence::Both => self.both += 1,
            Presence::Left => self.left += 1,
            Presence::Right => self.right += 1,
            Presence::NoHands => self.no_hands += 1,
        }
    }
}

/// Everything one run needs: the open log, the frame counter, and the abort flag.
pub struct Pipeline<S, L> {
    source: S,
    landmarker: L,
    sink: CsvSink,
    overlay: Option<OverlayWriter>,
    mirror: bool,
    abort: Arc<AtomicBool>,
    frame_no: u64,
    state: PipelineState,
    summary: RunSummary,
}

impl<S: FrameSource, L: HandLandmarker> Pipeline<S, L> {
    pub fn new(source: S, landmarker: L, sink: CsvSink) -> Self {
        let output = sink.path().to_path_buf();
        Self {
            source,
            landmarker,
            sink,
            overlay: None,
            mirror: true,
            abort: Arc::new(AtomicBool::new(false)),
            frame_no: 0,
            state: PipelineState::Ready,
            summary: RunSummary {
                output,
                ..Default::default()
            },
        }
    }

    pub fn with_overlay(mut self, overlay: Option<OverlayWriter>) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn with_mirror(mut self, mirror: bool) -> Self {
        self.mirror = mirror;
        self
    }

    /// Flag checked once per frame; setting it ends the run before the next frame.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    #[cfg(test)]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drive the loop to `Finished`. A pipeline runs once; its frame counter and log are spent.
    pub fn run(&mut self) -> Result<RunSummary> {
        if self.state == PipelineState::Finished {
            anyhow::bail!("pipeline already finished");
        }
        let start = Instant::now();
        info!("Analyzing {}", self.source.describe());

        loop {
            if self.abort.load(Ordering::SeqCst) {
                info!("Abort requested after {} frames", self.frame_no);
                self.summary.aborted = true;
                break;
            }

            let Some(frame) = self.source.next_frame()? else {
                info!("Finished analyzing video");
                break;
            };
            self.state = PipelineState::ProcessingFrame;
            self.process_frame(frame)?;
            self.state = PipelineState::RowPersisted;
        }

        self.state = PipelineState::Finished;
        self.summary.elapsed = start.elapsed();
        let s = &self.summary;
        info!(
            "Analysis concluded in {:.2} seconds: {} frames, {} rows (both {}, left {}, right {}, none {}, malformed {}). Results recorded in {}",
            s.elapsed.as_secs_f64(),
            s.frames,
            self.sink.rows_written(),
            s.both,
            s.left,
            s.right,
            s.no_hands,
            s.malformed,
            s.output.display()
        );
        Ok(self.summary.clone())
    }

    fn process_frame(&mut self, frame: DynamicImage) -> Result<()> {
        let image = if self.mirror { frame.fliph() } else { frame };

        let (raw, hands) = self.detect(&image)?;
        let (slots, presence) = resolve(&hands);
        let row = OutputRow::assemble(self.frame_no, presence, slots);
        self.sink.append(&row)?;
        debug!("Frame {}: {}", self.frame_no, presence);

        if let Some(overlay) = &self.overlay {
            if let Err(e) = overlay.write(self.frame_no, &image, &raw) {
                warn!("Overlay for frame {} failed: {:#}", self.frame_no, e);
            }
        }

        self.summary.record(presence);
        self.frame_no += 1;
        Ok(())
    }

    /// A malformed detection drops every hand of the frame; the row is written as NoHands.
    fn detect(&mut self, image: &DynamicImage) -> Result<(Vec<RawHand>, Vec<DetectedHand>)> {
        let raw = match self.landmarker.detect(image) {
            Ok(raw) => raw,
            Err(e) if is_malformed(&e) => {
                warn!("Frame {}: {:#}; writing NoHands", self.frame_no, e);
                self.summary.malformed += 1;
                return Ok((Vec::new(), Vec::new()));
            }
            Err(e) => return Err(e),
        };

        match validate_frame(&raw) {
            Ok(hands) => Ok((raw, hands)),
            Err(e) => {
                warn!("Frame {}: {}; writing NoHands", self.frame_no, e);
                self.summary.malformed += 1;
                Ok((raw, Vec::new()))
            }
        }
    }
}

fn is_malformed(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<TrackerError>(),
        Some(TrackerError::MalformedDetection(_))
    )
}
