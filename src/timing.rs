use std::time::{Duration, Instant};

use itertools::Itertools;

use crate::util::coeff_variation;

/// Standard characters-per-word used by every wpm figure.
pub const CHARS_PER_WORD: f64 = 5.0;

/// Number of trailing inter-keystroke gaps considered when pacing the caret.
pub const PACING_WINDOW: usize = 8;

pub fn wpm(correct_chars: usize, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    correct_chars as f64 * (60.0 / (secs * CHARS_PER_WORD))
}

/// Append-only log of accepted keystroke times for one session.
///
/// The session starts with the first recorded keystroke, not when the
/// recorder is created.
#[derive(Debug, Clone, Default)]
pub struct TimingRecorder {
    timestamps: Vec<Instant>,
}

impl TimingRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self) -> Instant {
        let now = Instant::now();
        self.record_at(now);
        now
    }

    pub fn record_at(&mut self, at: Instant) {
        self.timestamps.push(at);
    }

    pub fn has_started(&self) -> bool {
        !self.timestamps.is_empty()
    }

    pub fn started_at(&self) -> Option<Instant> {
        self.timestamps.first().copied()
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Time between the first and the last accepted keystroke.
    pub fn elapsed(&self) -> Duration {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last.saturating_duration_since(*first),
            _ => Duration::ZERO,
        }
    }

    /// Wall-clock time since the first keystroke, used by the timed and zen modes.
    pub fn elapsed_until(&self, now: Instant) -> Duration {
        self.started_at()
            .map_or(Duration::ZERO, |start| now.saturating_duration_since(start))
    }

    pub fn last_gap(&self) -> Option<Duration> {
        self.timestamps
            .iter()
            .rev()
            .take(2)
            .collect_tuple()
            .map(|(last, prev): (&Instant, &Instant)| last.saturating_duration_since(*prev))
    }

    /// The last `n` inter-arrival gaps in seconds, oldest first.
    pub fn recent_gaps(&self, n: usize) -> Vec<f64> {
        let skip = self.timestamps.len().saturating_sub(n + 1);
        self.timestamps[skip..]
            .iter()
            .tuple_windows()
            .map(|(a, b)| b.saturating_duration_since(*a).as_secs_f64())
            .collect()
    }

    pub fn coeff_variation(&self) -> f64 {
        coeff_variation(&self.recent_gaps(PACING_WINDOW))
    }

    /// Per-frame caret delay for a transition of `frames` frames.
    ///
    /// Never exceeds `baseline`. The last gap is spread over the transition so
    /// the caret lands before the next keystroke is likely to arrive, and
    /// regular typing (low variation) shortens frames further.
    pub fn frame_delay(&self, baseline: Duration, frames: u32) -> Duration {
        if self.timestamps.len() < 3 {
            return baseline;
        }
        let Some(gap) = self.last_gap() else {
            return baseline;
        };
        let budget = gap / frames.max(1);
        let regularity = (0.5 + self.coeff_variation() / 2.0).clamp(0.5, 1.0);
        baseline.min(budget).mul_f64(regularity)
    }
}
