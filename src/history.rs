// Throughput history for graphing
//
// A fixed ring of per-interval rate samples, drawn as bars. One vertical
// unit stands for `scale_unit` bytes/sec; the scale doubles when a bar would
// hit the top and halves back towards the base when traffic calms down.

use crate::rate::RateSample;

/// Default number of bars
pub const DEFAULT_SLOTS: usize = 16;

/// Default bar height in units
pub const DEFAULT_HEIGHT: u64 = 21;

/// Most bars accepted
pub const MAX_SLOTS: usize = 4096;

/// Tallest bar height accepted, in units
pub const MAX_HEIGHT: u64 = 1000;

/// Bytes/sec a full-height graph shows at the base scale (150 kbit/s)
const BASE_FULL_SCALE: u64 = 150 * 125;

/// Shape of the history graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistorySettings {
    pub slots: usize,
    pub height: u64,
    /// Smallest bytes/sec per unit the scale may drop to
    pub base_unit: u64,
}

impl HistorySettings {
    /// Settings with the base scale derived from the height
    pub fn new(slots: usize, height: u64) -> Self {
        Self {
            slots,
            height,
            base_unit: BASE_FULL_SCALE / height.max(1),
        }
    }
}

impl Default for HistorySettings {
    fn default() -> Self {
        Self::new(DEFAULT_SLOTS, DEFAULT_HEIGHT)
    }
}

/// Circular buffer of rate samples with an adaptive bar scale
#[derive(Debug, Clone)]
pub struct HistoryGraph {
    samples: Vec<RateSample>,
    units: Vec<(u64, u64)>,
    cursor: usize,
    scale: u64,
    base: u64,
    height: u64,
    max_slot: usize,
}

impl HistoryGraph {
    pub fn new(settings: HistorySettings) -> Self {
        let slots = settings.slots.clamp(1, MAX_SLOTS);
        let base = settings.base_unit.max(1);

        Self {
            samples: vec![RateSample::default(); slots],
            units: vec![(0, 0); slots],
            cursor: 0,
            scale: base,
            base,
            height: settings.height.clamp(2, MAX_HEIGHT),
            max_slot: 0,
        }
    }

    /// Record one interval's rate in the next slot
    pub fn push(&mut self, sample: RateSample) {
        self.cursor = (self.cursor + 1) % self.samples.len();
        let slot = self.cursor;
        let evicted_max = slot == self.max_slot;

        self.samples[slot] = sample;
        self.units[slot] = self.units_of(sample, self.scale);

        if !evicted_max && sample.combined() >= self.samples[self.max_slot].combined() {
            self.max_slot = slot;
        }

        let (rx, tx) = self.units[slot];
        if rx + tx >= self.limit() || evicted_max {
            self.rescale();
        }
    }

    /// Bar heights in units, oldest first, as (rx, tx)
    pub fn render(&self) -> Vec<(u64, u64)> {
        let len = self.units.len();
        (1..=len)
            .map(|offset| self.units[(self.cursor + offset) % len])
            .collect()
    }

    /// Bytes/sec represented by one unit of bar height
    pub fn scale_unit(&self) -> u64 {
        self.scale
    }

    /// Slot holding the largest combined rate
    pub fn max_slot(&self) -> usize {
        self.max_slot
    }

    /// Slot written last
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn height(&self) -> u64 {
        self.height
    }

    /// Most recent sample
    pub fn latest(&self) -> RateSample {
        self.samples[self.cursor]
    }

    // Leave a unit of headroom at the top
    fn limit(&self) -> u64 {
        self.height - 1
    }

    fn units_of(&self, sample: RateSample, scale: u64) -> (u64, u64) {
        (sample.rx / scale, sample.tx / scale)
    }

    fn rescale(&mut self) {
        let mut max = 0;
        for (slot, sample) in self.samples.iter().enumerate() {
            if sample.combined() >= max {
                max = sample.combined();
                self.max_slot = slot;
            }
        }

        let limit = self.limit();
        let mut scale = self.scale;
        if max / scale >= limit {
            while max / scale >= limit {
                match scale.checked_mul(2) {
                    Some(doubled) => scale = doubled,
                    None => break,
                }
            }
        } else {
            while scale > self.base {
                if max / (scale / 2) >= limit {
                    break;
                }
                scale /= 2;
            }
        }

        if scale != self.scale {
            log::trace!(
                "Rescaling history graph from {} to {} B/s per unit (max {} B/s)",
                self.scale,
                scale,
                max
            );
            self.scale = scale;
            for slot in 0..self.samples.len() {
                self.units[slot] = self.units_of(self.samples[slot], scale);
            }
        }
    }
}
