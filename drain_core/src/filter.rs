//! Sliding-window smoothing plus the stability and descent signals that gate
//! drainage detection.
use std::collections::VecDeque;

use crate::config::FilterCfg;
use crate::sample::Sample;

/// Fixed-capacity ring of recent samples; the oldest is evicted on overflow.
#[derive(Debug, Clone)]
pub struct SampleWindow {
    buf: VecDeque<Sample>,
    cap: usize,
}

impl SampleWindow {
    pub fn new(cap: usize) -> Self {
        let cap = cap.max(1);
        Self {
            buf: VecDeque::with_capacity(cap),
            cap,
        }
    }

    pub fn push(&mut self, s: Sample) {
        if self.buf.len() == self.cap {
            self.buf.pop_front();
        }
        self.buf.push_back(s);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }

    /// Arithmetic mean of the window. `None` when empty.
    pub fn rolling_average(&self) -> Option<f64> {
        if self.buf.is_empty() {
            return None;
        }
        #[allow(clippy::cast_precision_loss)]
        let n = self.buf.len() as f64;
        Some(self.buf.iter().map(|s| s.mass_kg).sum::<f64>() / n)
    }

    /// True when every consecutive delta is strictly below `threshold_kg`.
    /// Zero or one sample is trivially stable.
    pub fn is_stable(&self, threshold_kg: f64) -> bool {
        self.buf
            .iter()
            .zip(self.buf.iter().skip(1))
            .all(|(a, b)| (b.mass_kg - a.mass_kg).abs() < threshold_kg)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.buf.iter()
    }
}

/// Consecutive strictly decreasing samples that count as a sustained descent.
pub const DESCENT_CONFIRM_SAMPLES: usize = 2;

/// A raw sample annotated with the window's view at the time it arrived.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredSample {
    pub sample: Sample,
    pub rolling_average_kg: f64,
    pub is_stable: bool,
    pub window_len: usize,
    /// Mass of the sample before this one, if any since the last reset.
    pub previous_kg: Option<f64>,
    /// How many samples in a row, ending with this one, were lower than their predecessor.
    pub descending_run: usize,
}

impl FilteredSample {
    /// Sustained fall: steady flow too fast for the stability band.
    pub fn is_descending(&self) -> bool {
        self.descending_run >= DESCENT_CONFIRM_SAMPLES
    }

    /// Flat within the noise band, or falling steadily. A lone spike is neither.
    pub fn is_trend(&self) -> bool {
        self.is_stable || self.is_descending()
    }
}

#[derive(Debug, Clone)]
pub struct SampleFilter {
    window: SampleWindow,
    stable_threshold_kg: f64,
    previous_kg: Option<f64>,
    descending_run: usize,
}

impl SampleFilter {
    pub fn new(cfg: &FilterCfg) -> Self {
        Self {
            window: SampleWindow::new(cfg.window),
            stable_threshold_kg: cfg.stable_threshold_kg,
            previous_kg: None,
            descending_run: 0,
        }
    }

    pub fn ingest(&mut self, sample: Sample) -> FilteredSample {
        self.window.push(sample);
        let previous_kg = self.previous_kg.replace(sample.mass_kg);
        self.descending_run = match previous_kg {
            Some(prev) if sample.mass_kg < prev => self.descending_run.saturating_add(1),
            _ => 0,
        };
        let out = FilteredSample {
            sample,
            rolling_average_kg: self.window.rolling_average().unwrap_or(sample.mass_kg),
            is_stable: self.window.is_stable(self.stable_threshold_kg),
            window_len: self.window.len(),
            previous_kg,
            descending_run: self.descending_run,
        };
        tracing::trace!(
            mass_kg = sample.mass_kg,
            avg_kg = out.rolling_average_kg,
            stable = out.is_stable,
            descending_run = out.descending_run,
            "sample filtered"
        );
        out
    }

    /// Forget history, e.g. after a connectivity gap.
    pub fn reset(&mut self) {
        self.window.clear();
        self.previous_kg = None;
        self.descending_run = 0;
    }

    pub fn window(&self) -> &SampleWindow {
        &self.window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn s(kg: f64, t: u64) -> Sample {
        Sample {
            mass_kg: kg,
            timestamp_ms: t,
        }
    }

    #[test]
    fn evicts_oldest_on_overflow() {
        let mut w = SampleWindow::new(3);
        for (i, kg) in [1.0, 2.0, 3.0, 4.0].into_iter().enumerate() {
            w.push(s(kg, i as u64));
        }
        assert_eq!(w.len(), 3);
        let first = w.iter().next().unwrap();
        assert_eq!(first.timestamp_ms, 1);
        assert!((w.rolling_average().unwrap() - 3.0).abs() < 1e-12);
    }

    #[test]
    fn single_and_empty_windows_are_stable() {
        let mut w = SampleWindow::new(5);
        assert!(w.is_stable(0.05));
        assert_eq!(w.rolling_average(), None);
        w.push(s(3.0, 0));
        assert!(w.is_stable(0.05));
    }

    #[test]
    fn one_large_jump_breaks_stability() {
        let mut w = SampleWindow::new(5);
        for (i, kg) in [2.00, 2.02, 2.04, 2.30, 2.32].into_iter().enumerate() {
            w.push(s(kg, i as u64));
        }
        assert!(!w.is_stable(0.05));
        // Once the jump rotates out the window recovers.
        for (i, kg) in [2.34, 2.36, 2.38].into_iter().enumerate() {
            w.push(s(kg, 10 + i as u64));
        }
        assert!(w.is_stable(0.05));
    }

    #[test]
    fn delta_equal_to_threshold_is_unstable() {
        let mut w = SampleWindow::new(5);
        w.push(s(1.0, 0));
        w.push(s(1.5, 1));
        assert!(!w.is_stable(0.5));
        assert!(w.is_stable(0.500_001));
    }

    #[test]
    fn zero_capacity_is_clamped_to_one() {
        let mut f = SampleFilter::new(&FilterCfg {
            window: 0,
            stable_threshold_kg: 0.05,
        });
        let a = f.ingest(s(1.0, 0));
        let b = f.ingest(s(5.0, 1));
        assert_eq!(a.window_len, 1);
        assert_eq!(b.window_len, 1);
        assert!(b.is_stable);
    }

    #[test]
    fn reset_clears_history() {
        let mut f = SampleFilter::new(&FilterCfg::default());
        f.ingest(s(1.0, 0));
        f.ingest(s(2.0, 1));
        f.reset();
        assert!(f.window().is_empty());
        let out = f.ingest(s(2.0, 2));
        assert!(out.is_stable);
        assert_eq!(out.window_len, 1);
        assert_eq!(out.previous_kg, None);
        assert_eq!(out.descending_run, 0);
    }

    #[test]
    fn fast_descent_is_a_trend_but_not_stable() {
        let mut f = SampleFilter::new(&FilterCfg::default());
        let runs: Vec<_> = [2.0, 1.9, 1.8, 1.7]
            .into_iter()
            .enumerate()
            .map(|(i, kg)| f.ingest(s(kg, i as u64)))
            .collect();
        assert!(runs.iter().all(|o| !o.is_stable || o.window_len == 1));
        assert_eq!(
            runs.iter().map(|o| o.descending_run).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
        assert!(!runs[1].is_trend());
        assert!(runs[2].is_trend());
        assert_eq!(runs[3].previous_kg, Some(1.8));
    }

    #[test]
    fn single_drop_or_plateau_resets_descent() {
        let mut f = SampleFilter::new(&FilterCfg::default());
        let outs: Vec<_> = [2.0, 1.5, 2.0, 1.5, 1.5]
            .into_iter()
            .enumerate()
            .map(|(i, kg)| f.ingest(s(kg, i as u64)))
            .collect();
        assert!(outs.iter().all(|o| o.descending_run <= 1));
        assert!(outs.iter().skip(1).all(|o| !o.is_trend()));
    }
}
