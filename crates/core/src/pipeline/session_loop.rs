use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::detection::domain::angle_estimator::AngleEstimator;
use crate::pipeline::performance_tracker::PerformanceTracker;
use crate::pipeline::proposal_pipeline::ProposalPipeline;
use crate::shared::candidate::{SelectedFace, VerificationResult};
use crate::shared::constants::{DEFAULT_JPEG_QUALITY, DEFAULT_STATS_INTERVAL, DEFAULT_TARGET_FPS};
use crate::transport::domain::frame_transport::{AnnotatedFrame, FrameTransport, TransportError};
use crate::video::domain::frame_encoder::FrameEncoder;
use crate::video::domain::frame_source::FrameSource;

pub struct SessionLoopConfig {
    pub target_fps: f64,
    pub jpeg_quality: u8,
    pub stats_interval: Duration,
}

impl Default for SessionLoopConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            stats_interval: DEFAULT_STATS_INTERVAL,
        }
    }
}

/// What the last delivered frame looked like, for the periodic report.
struct FrameReport {
    face: Option<SelectedFace>,
    proposal_count: usize,
    verification: Option<VerificationResult>,
}

enum IterationOutcome {
    Sent(FrameReport),
    Skipped,
    SourceExhausted,
    SessionClosed,
}

/// Drives the per-frame cadence: capture → detect/verify → angle →
/// encode → transport → pace.
///
/// One synchronous iteration per frame, no queues. When an iteration
/// finishes early the loop sleeps out the remainder of the target frame
/// interval; when it overruns, the next frame starts immediately
/// (degradation rather than backlog). Statistics are emitted on a time
/// interval, not a frame count, so a stalled pipeline still reports.
pub struct SessionLoop {
    source: Box<dyn FrameSource>,
    pipeline: ProposalPipeline,
    angle_estimator: AngleEstimator,
    encoder: Box<dyn FrameEncoder>,
    transport: Box<dyn FrameTransport>,
    tracker: PerformanceTracker,
    config: SessionLoopConfig,
    cancelled: Arc<AtomicBool>,
}

impl SessionLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Box<dyn FrameSource>,
        pipeline: ProposalPipeline,
        angle_estimator: AngleEstimator,
        encoder: Box<dyn FrameEncoder>,
        transport: Box<dyn FrameTransport>,
        tracker: PerformanceTracker,
        config: SessionLoopConfig,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            pipeline,
            angle_estimator,
            encoder,
            transport,
            tracker,
            config,
            cancelled,
        }
    }

    /// Runs until the source is exhausted, the consumer disconnects, or
    /// an interrupt arrives; all of those are orderly exits. Only a
    /// detector failure or a startup failure is an error.
    pub fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let info = self.source.open()?;
        log::info!("source opened at {}x{}", info.width, info.height);

        if let Err(e) = self.transport.start_session() {
            self.source.close();
            return match e {
                TransportError::HandshakeAborted => {
                    log::info!("interrupted before a consumer connected");
                    Ok(())
                }
                other => Err(other.into()),
            };
        }

        let frame_interval = Duration::from_secs_f64(1.0 / self.config.target_fps);
        let mut last_stats = Instant::now();
        let mut last_report: Option<FrameReport> = None;

        let result = loop {
            if self.cancelled.load(Ordering::Relaxed) {
                log::info!("interrupt received, shutting down");
                break Ok(());
            }

            let iteration_start = Instant::now();
            match self.run_iteration() {
                Ok(IterationOutcome::Sent(report)) => last_report = Some(report),
                Ok(IterationOutcome::Skipped) => {}
                Ok(IterationOutcome::SourceExhausted) => {
                    log::info!("frame source exhausted");
                    break Ok(());
                }
                Ok(IterationOutcome::SessionClosed) => break Ok(()),
                Err(e) => break Err(e),
            }

            if let Some(remaining) = frame_interval.checked_sub(iteration_start.elapsed()) {
                thread::sleep(remaining);
            }
            self.tracker.record_frame(iteration_start.elapsed());

            if last_stats.elapsed() >= self.config.stats_interval {
                self.log_stats(last_report.as_ref());
                last_stats = Instant::now();
            }
        };

        self.source.close();
        self.transport.close();
        if let Some(summary) = self.tracker.summary_string() {
            log::info!("\n{summary}");
        }
        result
    }

    fn run_iteration(&mut self) -> Result<IterationOutcome, Box<dyn std::error::Error>> {
        let frame = match self.source.next_frame() {
            Ok(Some(frame)) => frame,
            Ok(None) => return Ok(IterationOutcome::SourceExhausted),
            Err(e) => {
                log::warn!("frame capture failed, skipping: {e}");
                return Ok(IterationOutcome::Skipped);
            }
        };
        let gray = frame.to_luma();

        let detection_start = Instant::now();
        let run = self.pipeline.run(&gray)?;
        self.tracker.record_detection(detection_start.elapsed());

        let face = match run.selected {
            Some(bounding_box) => {
                let angle_degrees = match self.angle_estimator.estimate(&gray, &bounding_box) {
                    Ok(angle) => angle,
                    Err(e) => {
                        log::debug!("angle estimation failed: {e}");
                        0.0
                    }
                };
                Some(SelectedFace {
                    bounding_box,
                    angle_degrees,
                })
            }
            None => None,
        };

        let payload = match self.encoder.encode(&frame, self.config.jpeg_quality) {
            Ok(payload) => payload,
            Err(e) => {
                log::warn!("frame encode failed, skipping: {e}");
                return Ok(IterationOutcome::Skipped);
            }
        };

        let annotated = AnnotatedFrame {
            width: frame.width(),
            height: frame.height(),
            face: face.map(|f| f.bounding_box),
            angle_degrees: face.map_or(0.0, |f| f.angle_degrees as f32),
            payload,
        };

        let transport_start = Instant::now();
        match self.transport.send_frame(&annotated) {
            Ok(()) => {
                self.tracker.record_transport(transport_start.elapsed());
                Ok(IterationOutcome::Sent(FrameReport {
                    face,
                    proposal_count: run.proposal_count,
                    verification: run.verification,
                }))
            }
            Err(TransportError::SessionClosed(e)) => {
                log::info!("consumer disconnected: {e}");
                Ok(IterationOutcome::SessionClosed)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn log_stats(&self, last: Option<&FrameReport>) {
        let mode = if self.pipeline.verification_enabled() {
            "proposal+verify"
        } else {
            "proposal-only"
        };
        let face_status = match last.and_then(|r| r.face) {
            Some(_) => "face",
            None => "no face",
        };
        let proposals = last.map_or(0, |r| r.proposal_count);
        let verification = last
            .and_then(|r| r.verification)
            .map(|v| {
                format!(
                    " | verify {} ({:+.2})",
                    if v.accepted { "ok" } else { "reject" },
                    v.confidence
                )
            })
            .unwrap_or_default();

        log::info!(
            "fps {:5.1} | {mode} | {face_status} | proposals {proposals} | detect {:5.1}ms | transport {:5.1}ms{verification}",
            self.tracker.average_fps(),
            self.tracker.mean_detection_ms(),
            self.tracker.mean_transport_ms(),
        );
    }
}
