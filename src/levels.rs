//! Support and resistance levels.
//!
//! [`identify_support_resistance`] is the dashboard's level scan: a strict
//! local-extremum test over a fixed 5-bar window (two bars each side).
//! [`swing_levels`] is the wider swing-point scan with level clustering, and
//! [`pivot_points`] the classic floor pivots of the latest bar.

use serde::{Deserialize, Serialize};

use crate::model::Candle;

/// Bars required on each side of a candidate in the 5-bar scan.
pub const EXTREMUM_REACH: usize = 2;

/// Which end of the ascending level list survives truncation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelSelection {
    /// Keep the first entries of the ascending list (the smallest values).
    #[default]
    Lowest,
    /// Keep the last entries of the ascending list (the largest values).
    Highest,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SupportResistance {
    pub support: Vec<f64>,
    pub resistance: Vec<f64>,
}

/// Local-extremum scan over `candles`.
///
/// Position `i` in `2..=n-3` is a support point when its low is strictly below
/// the lows of the two bars on each side, and a resistance point when its high
/// is strictly above the highs of the two bars on each side. Both lists are
/// sorted ascending and truncated to `max_levels` entries taken from the end
/// chosen by `keep`.
pub fn identify_support_resistance(
    candles: &[Candle],
    max_levels: usize,
    keep: LevelSelection,
) -> SupportResistance {
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();

    let support = strict_extrema(&lows, EXTREMUM_REACH, |candidate, other| candidate < other);
    let resistance = strict_extrema(&highs, EXTREMUM_REACH, |candidate, other| candidate > other);

    SupportResistance {
        support: truncate_sorted(support, max_levels, keep),
        resistance: truncate_sorted(resistance, max_levels, keep),
    }
}

/// Values at every position whose `reach` neighbours on both sides all lose
/// against it under `beats`, in position order.
fn strict_extrema(values: &[f64], reach: usize, beats: impl Fn(f64, f64) -> bool) -> Vec<f64> {
    if values.len() < 2 * reach + 1 {
        return Vec::new();
    }
    (reach..values.len() - reach)
        .filter(|&i| {
            (i - reach..=i + reach)
                .filter(|&j| j != i)
                .all(|j| beats(values[i], values[j]))
        })
        .map(|i| values[i])
        .collect()
}

fn sort_ascending(levels: &mut [f64]) {
    levels.sort_by(f64::total_cmp);
}

fn truncate_sorted(mut levels: Vec<f64>, max_levels: usize, keep: LevelSelection) -> Vec<f64> {
    sort_ascending(&mut levels);
    match keep {
        LevelSelection::Lowest => levels.truncate(max_levels),
        LevelSelection::Highest => {
            let excess = levels.len().saturating_sub(max_levels);
            levels.drain(..excess);
        }
    }
    levels
}

/// Swing-point levels with clustering.
///
/// A swing low is strictly below the `window` lows on each side; a swing high
/// strictly above the `window` highs on each side. Nearby levels are then
/// merged by [`cluster_levels`].
pub fn swing_levels(candles: &[Candle], window: usize, threshold: f64) -> SupportResistance {
    let lows: Vec<f64> = candles.iter().map(|c| c.low).collect();
    let highs: Vec<f64> = candles.iter().map(|c| c.high).collect();

    SupportResistance {
        support: cluster_levels(
            strict_extrema(&lows, window, |candidate, other| candidate < other),
            threshold,
        ),
        resistance: cluster_levels(
            strict_extrema(&highs, window, |candidate, other| candidate > other),
            threshold,
        ),
    }
}

/// Merge levels lying within `threshold` (a fraction) of the running cluster
/// mean; each cluster is replaced by its mean. Output is ascending.
pub fn cluster_levels(mut levels: Vec<f64>, threshold: f64) -> Vec<f64> {
    sort_ascending(&mut levels);
    let mut clustered = Vec::new();
    let mut current: Vec<f64> = Vec::new();

    for level in levels {
        if let Some(avg) = mean(&current) {
            if (level - avg) / avg > threshold {
                clustered.push(avg);
                current.clear();
            }
        }
        current.push(level);
    }
    clustered.extend(mean(&current));
    clustered
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Classic floor pivots computed from a single bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PivotPoints {
    pub pivot: f64,
    pub r1: f64,
    pub r2: f64,
    pub s1: f64,
    pub s2: f64,
}

/// Pivot points of the most recent candle, `None` for an empty series.
pub fn pivot_points(candles: &[Candle]) -> Option<PivotPoints> {
    let last = candles.last()?;
    let pivot = (last.high + last.low + last.close) / 3.0;
    let range = last.range();
    Some(PivotPoints {
        pivot,
        r1: 2.0 * pivot - last.low,
        r2: pivot + range,
        s1: 2.0 * pivot - last.high,
        s2: pivot - range,
    })
}
