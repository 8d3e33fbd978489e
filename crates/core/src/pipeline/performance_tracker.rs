use std::collections::VecDeque;
use std::time::Duration;

pub const DEFAULT_WINDOW: usize = 120;

/// Rolling per-stage timing statistics over a bounded window.
///
/// Three ring buffers (total iteration, detection, transport) hold the
/// most recent samples; older samples fall off the front. No persistence:
/// the tracker resets only on process restart.
pub struct PerformanceTracker {
    window: usize,
    frame_secs: VecDeque<f64>,
    detection_secs: VecDeque<f64>,
    transport_secs: VecDeque<f64>,
    total_frames: u64,
}

impl PerformanceTracker {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            frame_secs: VecDeque::with_capacity(window),
            detection_secs: VecDeque::with_capacity(window),
            transport_secs: VecDeque::with_capacity(window),
            total_frames: 0,
        }
    }

    pub fn record_frame(&mut self, duration: Duration) {
        push_bounded(&mut self.frame_secs, duration.as_secs_f64(), self.window);
        self.total_frames += 1;
    }

    pub fn record_detection(&mut self, duration: Duration) {
        push_bounded(&mut self.detection_secs, duration.as_secs_f64(), self.window);
    }

    pub fn record_transport(&mut self, duration: Duration) {
        push_bounded(&mut self.transport_secs, duration.as_secs_f64(), self.window);
    }

    /// Frames processed since startup, not bounded by the window.
    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    /// Smoothed frame rate: window length over the summed frame times.
    pub fn average_fps(&self) -> f64 {
        let sum: f64 = self.frame_secs.iter().sum();
        if sum <= 0.0 {
            return 0.0;
        }
        self.frame_secs.len() as f64 / sum
    }

    pub fn mean_frame_ms(&self) -> f64 {
        mean_ms(&self.frame_secs)
    }

    pub fn mean_detection_ms(&self) -> f64 {
        mean_ms(&self.detection_secs)
    }

    pub fn mean_transport_ms(&self) -> f64 {
        mean_ms(&self.transport_secs)
    }

    /// Formatted end-of-run report, or `None` if nothing was recorded.
    pub fn summary_string(&self) -> Option<String> {
        if self.frame_secs.is_empty() {
            return None;
        }
        let mut lines = vec![format!(
            "Session summary ({} frames, window {}):",
            self.total_frames, self.window
        )];
        lines.push(format!("  avg rate  : {:6.1} fps", self.average_fps()));
        lines.push(format!("  frame     : {:6.1} ms", self.mean_frame_ms()));
        lines.push(format!("  detection : {:6.1} ms", self.mean_detection_ms()));
        lines.push(format!("  transport : {:6.1} ms", self.mean_transport_ms()));
        Some(lines.join("\n"))
    }
}

impl Default for PerformanceTracker {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

fn push_bounded(buffer: &mut VecDeque<f64>, value: f64, window: usize) {
    if buffer.len() == window {
        buffer.pop_front();
    }
    buffer.push_back(value);
}

fn mean_ms(buffer: &VecDeque<f64>) -> f64 {
    if buffer.is_empty() {
        return 0.0;
    }
    buffer.iter().sum::<f64>() / buffer.len() as f64 * 1000.0
}
