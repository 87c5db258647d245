use rand::{Rng as _, SeedableRng as _};
use rand_pcg::Pcg32;

use super::config::PieceShape;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    enabled: bool,
    percentage: f64,
}

/// Self-adjusting weighted sampler choosing the next piece kind.
///
/// Each kind carries a percentage; the percentages of enabled kinds sum to
/// one. After a kind is drawn it keeps `retention` of its percentage and the
/// rest is shared evenly by the other enabled kinds, which discourages
/// repeats while drifting back toward uniform over many draws. Disabled kinds
/// are never drawn and never receive any share.
///
/// # Example
///
/// ```
/// use boomfall_engine::WeightedPieceSelector;
///
/// let mut selector = WeightedPieceSelector::new([(true, 1.0), (true, 1.0)], 0.5, 42);
/// assert_eq!(selector.select(0.1), Some(0));
/// selector.rebalance(0);
/// assert_eq!(selector.percentages(), vec![0.25, 0.75]);
/// ```
#[derive(Debug, Clone)]
pub struct WeightedPieceSelector {
    rng: Pcg32,
    retention: f64,
    entries: Vec<Entry>,
}

impl WeightedPieceSelector {
    /// Creates a selector from `(enabled, weight)` pairs, one per kind.
    ///
    /// Weights of enabled kinds are normalized to percentages; disabled kinds
    /// start at zero.
    pub fn new<I>(kinds: I, retention: f64, seed: u64) -> Self
    where
        I: IntoIterator<Item = (bool, f64)>,
    {
        let mut entries: Vec<_> = kinds
            .into_iter()
            .map(|(enabled, weight)| Entry {
                enabled,
                percentage: if enabled { weight.max(0.0) } else { 0.0 },
            })
            .collect();
        let total: f64 = entries.iter().map(|e| e.percentage).sum();
        if total > 0.0 {
            for entry in &mut entries {
                entry.percentage /= total;
            }
        }
        Self {
            rng: Pcg32::seed_from_u64(seed),
            retention: retention.clamp(0.0, 1.0),
            entries,
        }
    }

    #[must_use]
    pub fn from_pieces(pieces: &[PieceShape], retention: f64, seed: u64) -> Self {
        Self::new(
            pieces.iter().map(|p| (p.enabled, p.weight)),
            retention,
            seed,
        )
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn is_enabled(&self, kind: usize) -> bool {
        self.entries.get(kind).is_some_and(|e| e.enabled)
    }

    #[must_use]
    pub fn percentage(&self, kind: usize) -> f64 {
        self.entries.get(kind).map_or(0.0, |e| e.percentage)
    }

    #[must_use]
    pub fn percentages(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.percentage).collect()
    }

    /// Maps a sample in `[0, 1)` to a kind by walking the cumulative
    /// percentages.
    ///
    /// Returns `None` only when no enabled kind has a nonzero percentage.
    #[must_use]
    pub fn select(&self, sample: f64) -> Option<usize> {
        let mut sum = 0.0;
        let mut last = None;
        for (kind, entry) in self.entries.iter().enumerate() {
            if !entry.enabled || entry.percentage <= 0.0 {
                continue;
            }
            sum += entry.percentage;
            last = Some(kind);
            if sum >= sample {
                return last;
            }
        }
        // Rounding can leave the total slightly below the sample.
        last
    }

    /// Moves the share given up by `kind` to the other enabled kinds.
    pub fn rebalance(&mut self, kind: usize) {
        let others = self
            .entries
            .iter()
            .enumerate()
            .filter(|&(i, e)| i != kind && e.enabled)
            .count();
        if others == 0 {
            return;
        }
        let Some(entry) = self.entries.get_mut(kind).filter(|e| e.enabled) else {
            return;
        };
        let removed = entry.percentage * (1.0 - self.retention);
        entry.percentage -= removed;
        #[expect(clippy::cast_precision_loss)]
        let share = removed / others as f64;
        for (i, entry) in self.entries.iter_mut().enumerate() {
            if i != kind && entry.enabled {
                entry.percentage += share;
            }
        }
    }

    /// Draws a kind and rebalances.
    pub fn draw(&mut self) -> Option<usize> {
        let sample: f64 = self.rng.random();
        let kind = self.select(sample)?;
        self.rebalance(kind);
        Some(kind)
    }
}
