// Rate computation and display smoothing
//
// Counters are sampled once per update interval. Rather than jumping to each
// new rate, the displayed value walks from the previous interval's rate to
// the new one in K sub-steps whose weights grow quadratically, so most of
// the change lands early and the tail eases in.

use crate::backends::stats::CounterSample;
use std::time::Duration;

/// Longest update interval accepted, in seconds
pub const MAX_INTERVAL_SECS: u64 = 3600;

/// Most smoothing sub-steps accepted per interval
pub const MAX_SMOOTHING_STEPS: u32 = 1000;

/// Bytes per second received and transmitted over one interval
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RateSample {
    pub rx: u64,
    pub tx: u64,
}

impl RateSample {
    pub fn new(rx: u64, tx: u64) -> Self {
        Self { rx, tx }
    }

    pub fn combined(&self) -> u64 {
        self.rx + self.tx
    }
}

/// Weights and deadlines of the smoothing sub-steps within one interval
#[derive(Debug, Clone)]
pub struct SmoothingSchedule {
    steps: u32,
    interval_ms: u64,
    weights: Vec<f64>,
    remaining_ms: Vec<u64>,
}

impl SmoothingSchedule {
    /// Build the schedule for `steps` sub-steps per `interval_secs`
    ///
    /// Weight `i` is `i(i+1) / Σ j(j+1)` over `0..=steps`. Entry `i` of the
    /// time table is how much of the interval is left when sub-step `i` is
    /// due; it shrinks by `interval * weight(i)` per step and ends at zero.
    pub fn new(steps: u32, interval_secs: u64) -> Self {
        let steps = steps.clamp(1, MAX_SMOOTHING_STEPS);
        let interval_ms = interval_secs.clamp(1, MAX_INTERVAL_SECS) * 1000;

        let slices = |i: u64| i * (i + 1);
        let total: u64 = (0..=steps as u64).map(slices).sum();

        let weights = (0..=steps as u64)
            .map(|i| slices(i) as f64 / total as f64)
            .collect();

        let mut remaining_ms = vec![0; steps as usize + 1];
        remaining_ms[0] = interval_ms;
        for i in 1..steps as usize {
            // Truncating a whole number of ms minus the slice rounds the
            // slice up
            let slice = (interval_ms * slices(i as u64)).div_ceil(total);
            remaining_ms[i] = remaining_ms[i - 1].saturating_sub(slice);
        }

        Self {
            steps,
            interval_ms,
            weights,
            remaining_ms,
        }
    }

    pub fn steps(&self) -> u32 {
        self.steps
    }

    pub fn weight(&self, i: u32) -> f64 {
        self.weights[i as usize]
    }

    pub fn remaining_ms(&self, i: u32) -> u64 {
        self.remaining_ms[i as usize]
    }

    /// How long to wait, `elapsed` into the interval, before sub-step `step`
    pub fn timeout(&self, step: u32, elapsed: Duration) -> Duration {
        let elapsed_ms = elapsed.as_millis() as u64;
        let remaining = self.remaining_ms(step);

        if remaining + elapsed_ms > self.interval_ms {
            return Duration::ZERO;
        }
        Duration::from_millis(self.interval_ms - elapsed_ms - remaining)
    }
}

/// Turns counter samples into per-interval rates and a smoothed display value
#[derive(Debug, Clone)]
pub struct RateEngine {
    schedule: SmoothingSchedule,
    interval_secs: u64,
    baseline: Option<CounterSample>,
    previous: u64,
    current: RateSample,
    displayed: u64,
}

impl RateEngine {
    pub fn new(steps: u32, interval_secs: u64) -> Self {
        let interval_secs = interval_secs.clamp(1, MAX_INTERVAL_SECS);
        Self {
            schedule: SmoothingSchedule::new(steps, interval_secs),
            interval_secs,
            baseline: None,
            previous: 0,
            current: RateSample::default(),
            displayed: 0,
        }
    }

    pub fn schedule(&self) -> &SmoothingSchedule {
        &self.schedule
    }

    pub fn steps(&self) -> u32 {
        self.schedule.steps()
    }

    /// Set the baseline without producing a rate
    pub fn prime(&mut self, sample: Option<CounterSample>) {
        self.baseline = sample;
    }

    /// Close an interval with a fresh counter read
    ///
    /// `None` means the read failed: the baseline is kept, so the interval
    /// counts as idle. A counter that went backwards (interface recreated,
    /// counter wrap) becomes the new baseline and the interval also counts
    /// as idle. The first smoothing step is applied before returning.
    pub fn record(&mut self, sample: Option<CounterSample>) -> RateSample {
        let rate = match (sample, self.baseline) {
            (None, _) => RateSample::default(),
            (Some(sample), None) => {
                self.baseline = Some(sample);
                RateSample::default()
            }
            (Some(sample), Some(base))
                if sample.rx_bytes < base.rx_bytes || sample.tx_bytes < base.tx_bytes =>
            {
                log::debug!(
                    "Counters went backwards ({}/{} -> {}/{}), rebaselining",
                    base.rx_bytes,
                    base.tx_bytes,
                    sample.rx_bytes,
                    sample.tx_bytes
                );
                self.baseline = Some(sample);
                RateSample::default()
            }
            (Some(sample), Some(base)) => {
                self.baseline = Some(sample);
                RateSample::new(
                    (sample.rx_bytes - base.rx_bytes) / self.interval_secs,
                    (sample.tx_bytes - base.tx_bytes) / self.interval_secs,
                )
            }
        };

        self.previous = self.current.combined();
        self.current = rate;
        self.advance(1);
        rate
    }

    /// Apply smoothing sub-step `step` (1..=K) to the displayed value
    pub fn advance(&mut self, step: u32) {
        let steps = self.schedule.steps();
        let new = self.current.combined();

        if step < steps {
            let delta = (new as f64 - self.previous as f64) * self.schedule.weight(steps + 1 - step);
            self.displayed = (self.displayed as f64 + delta).max(0.0) as u64;
        } else {
            self.displayed = new;
        }
    }

    /// Smoothed combined rate, bytes per second
    pub fn displayed(&self) -> u64 {
        self.displayed
    }

    /// Whether the display has caught up with the measured rate
    pub fn is_settled(&self) -> bool {
        self.displayed == self.current.combined()
    }
}
