//! Built-in chart-pattern recogniser.
//!
//! Each position `i >= 2 * window` looks back over the `2 * window` bars that
//! precede it, collects 3-point swing highs and lows in that span and checks
//! them for double tops/bottoms and (inverse) head-and-shoulders shapes.

use error_stack::{Report, bail};
use serde::Serialize;

use crate::error::PatternError;
use crate::model::Candle;
use crate::pattern::{
    DOUBLE_BOTTOM, DOUBLE_TOP, HEAD_AND_SHOULDERS, INVERSE_HEAD_AND_SHOULDERS, PatternDetector,
    PatternFlags,
};

/// Two peaks (troughs) count as a double when within this fraction.
pub const DOUBLE_TOLERANCE: f64 = 0.01;
/// The trough between double-top peaks must sit below this share of the lower peak.
pub const DOUBLE_TOP_TROUGH_RATIO: f64 = 0.98;
/// The peak between double-bottom troughs must sit above this share of the higher trough.
pub const DOUBLE_BOTTOM_PEAK_RATIO: f64 = 1.02;
/// Shoulder heights must agree within this fraction.
pub const SHOULDER_TOLERANCE: f64 = 0.05;
/// Trend slope threshold as a share of the mean close per bar.
pub const TREND_SLOPE_RATIO: f64 = 0.01;

pub const MIN_WINDOW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Uptrend,
    Downtrend,
    Neutral,
}

pub struct ChartPatterns {
    window: usize,
}

#[derive(Debug, Clone, Copy)]
struct Swing {
    index: usize,
    value: f64,
}

impl ChartPatterns {
    pub fn new(window: usize) -> Result<Self, Report<PatternError>> {
        if window < MIN_WINDOW {
            bail!(PatternError::InvalidParameter {
                name: format!("window must be >= {MIN_WINDOW}"),
            });
        }
        Ok(Self { window })
    }

    /// Trend classification per position from the least-squares slope of the
    /// `window` closes before it; positions without a full window are neutral.
    pub fn trend(&self, candles: &[Candle]) -> Vec<Trend> {
        let mut trends = vec![Trend::Neutral; candles.len()];
        for (i, trend) in trends.iter_mut().enumerate().skip(self.window) {
            let closes: Vec<f64> = candles[i - self.window..i].iter().map(|c| c.close).collect();
            *trend = classify_slope(&closes);
        }
        trends
    }

    fn double_top(&self, peaks: &[Swing], troughs: &[Swing]) -> bool {
        peaks.windows(2).any(|pair| {
            let (first, second) = (pair[0], pair[1]);
            let floor = first.value.min(second.value) * DOUBLE_TOP_TROUGH_RATIO;
            (first.value - second.value).abs() / first.value < DOUBLE_TOLERANCE
                && second.index - first.index > self.window / 4
                && troughs
                    .iter()
                    .any(|t| first.index < t.index && t.index < second.index && t.value < floor)
        })
    }

    fn double_bottom(&self, peaks: &[Swing], troughs: &[Swing]) -> bool {
        troughs.windows(2).any(|pair| {
            let (first, second) = (pair[0], pair[1]);
            let ceiling = first.value.max(second.value) * DOUBLE_BOTTOM_PEAK_RATIO;
            (first.value - second.value).abs() / first.value < DOUBLE_TOLERANCE
                && second.index - first.index > self.window / 4
                && peaks
                    .iter()
                    .any(|p| first.index < p.index && p.index < second.index && p.value > ceiling)
        })
    }
}

impl PatternDetector for ChartPatterns {
    fn name(&self) -> &str {
        "chart"
    }

    fn detect(&self, candles: &[Candle]) -> Result<PatternFlags, Report<PatternError>> {
        let n = candles.len();
        let span = 2 * self.window;
        let mut double_top = vec![false; n];
        let mut double_bottom = vec![false; n];
        let mut head_and_shoulders = vec![false; n];
        let mut inverse = vec![false; n];

        for i in span..n {
            let section = &candles[i - span..i];
            let peaks = swing_highs(section);
            let troughs = swing_lows(section);

            double_top[i] = self.double_top(&peaks, &troughs);
            double_bottom[i] = self.double_bottom(&peaks, &troughs);
            head_and_shoulders[i] = last_three(&peaks).is_some_and(|[l, h, r]| {
                h.value > l.value && h.value > r.value && shoulders_match(l, r)
            });
            inverse[i] = last_three(&troughs).is_some_and(|[l, h, r]| {
                h.value < l.value && h.value < r.value && shoulders_match(l, r)
            });
        }

        Ok(PatternFlags::from([
            (DOUBLE_TOP.to_string(), double_top),
            (DOUBLE_BOTTOM.to_string(), double_bottom),
            (HEAD_AND_SHOULDERS.to_string(), head_and_shoulders),
            (INVERSE_HEAD_AND_SHOULDERS.to_string(), inverse),
        ]))
    }
}

fn swings(values: &[f64], beats: impl Fn(f64, f64) -> bool) -> Vec<Swing> {
    values
        .windows(3)
        .enumerate()
        .filter(|(_, w)| beats(w[1], w[0]) && beats(w[1], w[2]))
        .map(|(j, w)| Swing {
            index: j + 1,
            value: w[1],
        })
        .collect()
}

fn swing_highs(section: &[Candle]) -> Vec<Swing> {
    let highs: Vec<f64> = section.iter().map(|c| c.high).collect();
    swings(&highs, |a, b| a > b)
}

fn swing_lows(section: &[Candle]) -> Vec<Swing> {
    let lows: Vec<f64> = section.iter().map(|c| c.low).collect();
    swings(&lows, |a, b| a < b)
}

fn last_three(swings: &[Swing]) -> Option<[Swing; 3]> {
    let tail = swings.get(swings.len().checked_sub(3)?..)?;
    Some([tail[0], tail[1], tail[2]])
}

fn shoulders_match(left: Swing, right: Swing) -> bool {
    (left.value - right.value).abs() / left.value < SHOULDER_TOLERANCE
}

fn classify_slope(closes: &[f64]) -> Trend {
    let n = closes.len() as f64;
    let mean_x = (n - 1.0) / 2.0;
    let mean_y = closes.iter().sum::<f64>() / n;
    let (cov, var) = closes
        .iter()
        .enumerate()
        .fold((0.0, 0.0), |(cov, var), (x, &y)| {
            let dx = x as f64 - mean_x;
            (cov + dx * (y - mean_y), var + dx * dx)
        });
    if var == 0.0 {
        return Trend::Neutral;
    }
    let slope = cov / var;
    let threshold = TREND_SLOPE_RATIO * mean_y / n;
    if slope > threshold {
        Trend::Uptrend
    } else if slope < -threshold {
        Trend::Downtrend
    } else {
        Trend::Neutral
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::{candles_from_closes, candles_from_high_low};

    fn from_highs(highs: &[f64]) -> Vec<Candle> {
        let lows: Vec<f64> = highs.iter().map(|h| h - 1.0).collect();
        candles_from_high_low(highs, &lows)
    }

    fn from_lows(lows: &[f64]) -> Vec<Candle> {
        let highs: Vec<f64> = lows.iter().map(|l| l + 1.0).collect();
        candles_from_high_low(&highs, lows)
    }

    fn hits(flags: &PatternFlags, name: &str) -> Vec<usize> {
        flags[name]
            .iter()
            .enumerate()
            .filter_map(|(i, &hit)| hit.then_some(i))
            .collect()
    }

    #[test]
    fn window_below_minimum_rejected() {
        assert!(ChartPatterns::new(3).is_err());
        assert!(ChartPatterns::new(MIN_WINDOW).is_ok());
    }

    #[test]
    fn double_top_detected_after_the_span() {
        let detector = ChartPatterns::new(4).unwrap();
        let candles = from_highs(&[10.0, 12.0, 10.0, 8.0, 10.0, 12.0, 10.0, 10.0, 10.0]);
        let flags = detector.detect(&candles).unwrap();
        assert_eq!(hits(&flags, DOUBLE_TOP), vec![8]);
        assert!(hits(&flags, DOUBLE_BOTTOM).is_empty());
        assert!(hits(&flags, HEAD_AND_SHOULDERS).is_empty());
    }

    #[test]
    fn unequal_peaks_are_not_a_double_top() {
        let detector = ChartPatterns::new(4).unwrap();
        let candles = from_highs(&[10.0, 12.0, 10.0, 8.0, 10.0, 13.0, 10.0, 10.0, 10.0]);
        let flags = detector.detect(&candles).unwrap();
        assert!(hits(&flags, DOUBLE_TOP).is_empty());
    }

    #[test]
    fn head_and_shoulders_detected() {
        let detector = ChartPatterns::new(4).unwrap();
        let candles = from_highs(&[10.0, 12.0, 10.0, 15.0, 10.0, 12.0, 10.0, 10.0, 10.0]);
        let flags = detector.detect(&candles).unwrap();
        assert_eq!(hits(&flags, HEAD_AND_SHOULDERS), vec![8]);
        assert!(hits(&flags, DOUBLE_TOP).is_empty());
    }

    #[test]
    fn inverse_head_and_shoulders_detected() {
        let detector = ChartPatterns::new(4).unwrap();
        let candles = from_lows(&[10.0, 8.0, 10.0, 5.0, 10.0, 8.0, 10.0, 10.0, 10.0]);
        let flags = detector.detect(&candles).unwrap();
        assert_eq!(hits(&flags, INVERSE_HEAD_AND_SHOULDERS), vec![8]);
        assert!(hits(&flags, DOUBLE_BOTTOM).is_empty());
    }

    #[test]
    fn double_bottom_detected() {
        let detector = ChartPatterns::new(4).unwrap();
        let candles = from_lows(&[10.0, 8.0, 10.0, 12.0, 10.0, 8.0, 10.0, 10.0, 10.0]);
        let flags = detector.detect(&candles).unwrap();
        assert_eq!(hits(&flags, DOUBLE_BOTTOM), vec![8]);
    }

    #[test]
    fn short_series_has_no_patterns() {
        let detector = ChartPatterns::new(4).unwrap();
        let flags = detector.detect(&from_highs(&[1.0, 2.0, 1.0])).unwrap();
        assert_eq!(flags.len(), 4);
        assert!(flags.values().all(|f| f.len() == 3 && f.iter().all(|hit| !hit)));
    }

    #[test]
    fn trend_from_regression_slope() {
        let detector = ChartPatterns::new(4).unwrap();

        let rising: Vec<f64> = (0..8).map(|i| 100.0 + 2.0 * i as f64).collect();
        let trends = detector.trend(&candles_from_closes(&rising));
        assert_eq!(&trends[..4], &[Trend::Neutral; 4]);
        assert!(trends[4..].iter().all(|t| *t == Trend::Uptrend));

        let falling: Vec<f64> = (0..8).map(|i| 100.0 - 2.0 * i as f64).collect();
        let trends = detector.trend(&candles_from_closes(&falling));
        assert_eq!(trends[7], Trend::Downtrend);

        let flat = detector.trend(&candles_from_closes(&[50.0; 8]));
        assert!(flat.iter().all(|t| *t == Trend::Neutral));
    }
}
