use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

const WINDOW: usize = 120;

/// Frame times over a sliding window of the most recent frames.
pub struct FpsCounter {
    window: VecDeque<Duration>,
    window_total: Duration,
    last_tick: Instant,
    frames: u64,
}

impl FpsCounter {
    pub fn new() -> Self {
        FpsCounter {
            window: VecDeque::with_capacity(WINDOW),
            window_total: Duration::ZERO,
            last_tick: Instant::now(),
            frames: 0,
        }
    }

    pub fn tick(&mut self) {
        let now = Instant::now();
        self.record(now.duration_since(self.last_tick));
        self.last_tick = now;
    }

    fn record(&mut self, frame_time: Duration) {
        if self.window.len() == WINDOW
            && let Some(oldest) = self.window.pop_front()
        {
            self.window_total -= oldest;
        }
        self.window.push_back(frame_time);
        self.window_total += frame_time;
        self.frames += 1;
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn average_frame_time(&self) -> Option<Duration> {
        if self.window.is_empty() {
            return None;
        }
        Some(self.window_total / self.window.len() as u32)
    }

    /// Frame time that `percentile` percent of the window stays under.
    pub fn percentile_frame_time(&self, percentile: f64) -> Option<Duration> {
        let mut sorted = self.window.iter().copied().collect::<Vec<_>>();
        sorted.sort_unstable();

        let last = sorted.len().checked_sub(1)?;
        let rank = ((percentile / 100.0).clamp(0.0, 1.0) * last as f64).round() as usize;
        sorted.get(rank).copied()
    }

    pub fn summary(&self) -> String {
        let (Some(average), Some(p99)) = (
            self.average_frame_time(),
            self.percentile_frame_time(99.0),
        ) else {
            return "no frames".to_string();
        };

        format!(
            "{} frames, {:.2} ms avg ({:.1} FPS), {:.2} ms p99",
            self.frames,
            average.as_secs_f64() * 1000.0,
            1.0 / average.as_secs_f64().max(f64::EPSILON),
            p99.as_secs_f64() * 1000.0
        )
    }
}

impl Default for FpsCounter {
    fn default() -> Self {
        Self::new()
    }
}
