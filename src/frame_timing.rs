//! Rolling per-frame timing statistics.
//!
//! The session controller measures three phases of every frame: the frame
//! wait (compositor pacing), the render span between frame begin and frame
//! end, and the submit call itself.

use std::collections::VecDeque;
use std::fmt;

/// Rolling frame timing over a fixed window of samples.
#[derive(Debug, Clone)]
pub struct FrameTiming {
    wait_ms: VecDeque<f64>,
    render_ms: VecDeque<f64>,
    submit_ms: VecDeque<f64>,
    total_ms: VecDeque<f64>,
    window_size: usize,
    total_frames: u64,
    missed_frames: u64,
    budget_ms: f64,
}

impl Default for FrameTiming {
    fn default() -> Self {
        Self::new(1000, 11.1)
    }
}

impl FrameTiming {
    pub fn new(window_size: usize, budget_ms: f64) -> Self {
        let window_size = window_size.max(1);
        Self {
            wait_ms: VecDeque::with_capacity(window_size),
            render_ms: VecDeque::with_capacity(window_size),
            submit_ms: VecDeque::with_capacity(window_size),
            total_ms: VecDeque::with_capacity(window_size),
            window_size,
            total_frames: 0,
            missed_frames: 0,
            budget_ms,
        }
    }

    /// Record one frame. Render and submit time count against the budget;
    /// wait time is compositor pacing and does not.
    pub fn record_frame(&mut self, wait_ms: f64, render_ms: f64, submit_ms: f64) {
        let work = render_ms + submit_ms;

        Self::push_sample(&mut self.wait_ms, wait_ms, self.window_size);
        Self::push_sample(&mut self.render_ms, render_ms, self.window_size);
        Self::push_sample(&mut self.submit_ms, submit_ms, self.window_size);
        Self::push_sample(&mut self.total_ms, wait_ms + work, self.window_size);

        self.total_frames += 1;
        if work > self.budget_ms {
            self.missed_frames += 1;
        }
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn missed_frames(&self) -> u64 {
        self.missed_frames
    }

    pub fn samples(&self) -> usize {
        self.total_ms.len()
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.window_size, self.budget_ms);
    }

    fn push_sample(samples: &mut VecDeque<f64>, value: f64, window_size: usize) {
        if samples.len() == window_size {
            samples.pop_front();
        }
        samples.push_back(value);
    }

    fn sorted(samples: &VecDeque<f64>) -> Vec<f64> {
        let mut sorted: Vec<f64> = samples.iter().copied().collect();
        sorted.sort_by(|a, b| a.total_cmp(b));
        sorted
    }

    /// Percentile from a sorted slice
    fn percentile(sorted: &[f64], p: f64) -> f64 {
        if sorted.is_empty() {
            return 0.0;
        }
        let idx = ((sorted.len() as f64 - 1.0) * p / 100.0).round() as usize;
        sorted[idx.min(sorted.len() - 1)]
    }

    pub fn stats(&self) -> FrameTimingStats {
        let wait = Self::sorted(&self.wait_ms);
        let render = Self::sorted(&self.render_ms);
        let submit = Self::sorted(&self.submit_ms);
        let total = Self::sorted(&self.total_ms);

        let total_p50 = Self::percentile(&total, 50.0);
        FrameTimingStats {
            wait_p50: Self::percentile(&wait, 50.0),
            wait_p99: Self::percentile(&wait, 99.0),
            render_p50: Self::percentile(&render, 50.0),
            render_p99: Self::percentile(&render, 99.0),
            submit_p50: Self::percentile(&submit, 50.0),
            submit_p99: Self::percentile(&submit, 99.0),
            total_p50,
            total_p99: Self::percentile(&total, 99.0),
            fps: if total_p50 > 0.0 { 1000.0 / total_p50 } else { 0.0 },
            missed_pct: if self.total_frames > 0 {
                self.missed_frames as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            total_frames: self.total_frames,
            missed_frames: self.missed_frames,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FrameTimingStats {
    pub wait_p50: f64,
    pub wait_p99: f64,
    pub render_p50: f64,
    pub render_p99: f64,
    pub submit_p50: f64,
    pub submit_p99: f64,
    pub total_p50: f64,
    pub total_p99: f64,
    pub fps: f64,
    pub missed_pct: f64,
    pub total_frames: u64,
    pub missed_frames: u64,
}

impl fmt::Display for FrameTimingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "frames={} missed={} ({:.1}%) fps={:.0} wait p50={:.2}ms render p50={:.2}ms p99={:.2}ms submit p50={:.2}ms",
            self.total_frames,
            self.missed_frames,
            self.missed_pct,
            self.fps,
            self.wait_p50,
            self.render_p50,
            self.render_p99,
            self.submit_p50,
        )
    }
}
