//! Built-in candlestick recogniser.
//!
//! Thresholds are ratios of the bar's own anatomy, no averaging over a
//! lookback: a doji has a body of at most a tenth of its range, a hammer a
//! lower shadow of at least twice its body, and so on.

use error_stack::Report;

use crate::error::PatternError;
use crate::model::Candle;
use crate::pattern::{
    DOJI, ENGULFING_BEARISH, ENGULFING_BULLISH, EVENING_STAR, HAMMER, MORNING_STAR,
    PatternDetector, PatternFlags, SHOOTING_STAR,
};

/// Doji: body <= DOJI_BODY_RATIO * range.
pub const DOJI_BODY_RATIO: f64 = 0.1;
/// Hammer / shooting star: long shadow >= LONG_SHADOW_RATIO * body.
pub const LONG_SHADOW_RATIO: f64 = 2.0;
/// Hammer / shooting star: short shadow <= SHORT_SHADOW_RATIO * body.
pub const SHORT_SHADOW_RATIO: f64 = 0.5;
/// Star patterns: middle body < STAR_BODY_RATIO * first body.
pub const STAR_BODY_RATIO: f64 = 0.3;

pub struct CandlestickPatterns;

impl PatternDetector for CandlestickPatterns {
    fn name(&self) -> &str {
        "candlestick"
    }

    fn detect(&self, candles: &[Candle]) -> Result<PatternFlags, Report<PatternError>> {
        let single: [(&str, fn(&Candle) -> bool); 3] = [
            (DOJI, is_doji),
            (HAMMER, is_hammer),
            (SHOOTING_STAR, is_shooting_star),
        ];
        let double: [(&str, fn(&Candle, &Candle) -> bool); 2] = [
            (ENGULFING_BULLISH, is_bullish_engulfing),
            (ENGULFING_BEARISH, is_bearish_engulfing),
        ];
        let triple: [(&str, fn(&Candle, &Candle, &Candle) -> bool); 2] = [
            (MORNING_STAR, is_morning_star),
            (EVENING_STAR, is_evening_star),
        ];

        let mut flags = PatternFlags::new();
        for (name, test) in single {
            flags.insert(name.to_string(), candles.iter().map(test).collect());
        }
        for (name, test) in double {
            let mut hits = vec![false; candles.len()];
            for (i, w) in candles.windows(2).enumerate() {
                hits[i + 1] = test(&w[0], &w[1]);
            }
            flags.insert(name.to_string(), hits);
        }
        for (name, test) in triple {
            let mut hits = vec![false; candles.len()];
            for (i, w) in candles.windows(3).enumerate() {
                hits[i + 2] = test(&w[0], &w[1], &w[2]);
            }
            flags.insert(name.to_string(), hits);
        }
        Ok(flags)
    }
}

pub fn is_doji(c: &Candle) -> bool {
    c.body() <= DOJI_BODY_RATIO * c.range()
}

pub fn is_hammer(c: &Candle) -> bool {
    let body = c.body();
    body > 0.0
        && c.lower_shadow() >= LONG_SHADOW_RATIO * body
        && c.upper_shadow() <= SHORT_SHADOW_RATIO * body
}

pub fn is_shooting_star(c: &Candle) -> bool {
    let body = c.body();
    body > 0.0
        && c.upper_shadow() >= LONG_SHADOW_RATIO * body
        && c.lower_shadow() <= SHORT_SHADOW_RATIO * body
}

pub fn is_bullish_engulfing(prev: &Candle, cur: &Candle) -> bool {
    cur.is_bullish() && prev.is_bearish() && cur.open <= prev.close && cur.close >= prev.open
}

pub fn is_bearish_engulfing(prev: &Candle, cur: &Candle) -> bool {
    cur.is_bearish() && prev.is_bullish() && cur.open >= prev.close && cur.close <= prev.open
}

fn body_midpoint(c: &Candle) -> f64 {
    (c.open + c.close) / 2.0
}

pub fn is_morning_star(first: &Candle, middle: &Candle, last: &Candle) -> bool {
    first.is_bearish()
        && middle.body() < STAR_BODY_RATIO * first.body()
        && last.is_bullish()
        && last.close > body_midpoint(first)
}

pub fn is_evening_star(first: &Candle, middle: &Candle, last: &Candle) -> bool {
    first.is_bullish()
        && middle.body() < STAR_BODY_RATIO * first.body()
        && last.is_bearish()
        && last.close < body_midpoint(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::candle;

    #[test]
    fn doji_has_tiny_body() {
        assert!(is_doji(&candle(0, 10.0, 12.0, 8.0, 10.2)));
        assert!(!is_doji(&candle(0, 10.0, 12.0, 8.0, 11.0)));
        // zero range, zero body
        assert!(is_doji(&candle(0, 10.0, 10.0, 10.0, 10.0)));
    }

    #[test]
    fn hammer_and_shooting_star_are_mirrors() {
        let hammer = candle(0, 10.0, 11.2, 7.0, 11.0);
        assert!(is_hammer(&hammer));
        assert!(!is_shooting_star(&hammer));

        let star = candle(0, 11.0, 14.0, 9.8, 10.0);
        assert!(is_shooting_star(&star));
        assert!(!is_hammer(&star));
    }

    #[test]
    fn bodiless_bar_is_neither_hammer_nor_star() {
        let c = candle(0, 10.0, 12.0, 8.0, 10.0);
        assert!(!is_hammer(&c));
        assert!(!is_shooting_star(&c));
    }

    #[test]
    fn engulfing_needs_opposite_colours() {
        let bearish = candle(0, 11.0, 11.5, 9.5, 10.0);
        let bullish = candle(1, 9.8, 12.0, 9.5, 11.5);
        assert!(is_bullish_engulfing(&bearish, &bullish));
        assert!(!is_bearish_engulfing(&bearish, &bullish));

        let small_bullish = candle(1, 10.2, 11.0, 10.0, 10.8);
        assert!(!is_bullish_engulfing(&bearish, &small_bullish));

        let up = candle(0, 10.0, 11.5, 9.5, 11.0);
        let down = candle(1, 11.2, 11.5, 9.0, 9.5);
        assert!(is_bearish_engulfing(&up, &down));
    }

    #[test]
    fn morning_and_evening_star() {
        let first = candle(0, 12.0, 12.5, 9.5, 10.0);
        let middle = candle(1, 9.8, 10.0, 9.0, 9.7);
        let last = candle(2, 10.0, 12.0, 9.9, 11.5);
        assert!(is_morning_star(&first, &middle, &last));
        assert!(!is_evening_star(&first, &middle, &last));

        let first = candle(0, 10.0, 12.5, 9.5, 12.0);
        let middle = candle(1, 12.2, 12.6, 12.0, 12.3);
        let last = candle(2, 12.0, 12.1, 10.0, 10.5);
        assert!(is_evening_star(&first, &middle, &last));
    }

    #[test]
    fn detector_flags_align_with_positions() {
        let candles = vec![
            candle(0, 11.0, 11.5, 9.5, 10.0),
            candle(1, 9.8, 12.0, 9.5, 11.5),
            candle(2, 11.0, 11.0, 11.0, 11.0),
        ];
        let flags = CandlestickPatterns.detect(&candles).unwrap();
        assert_eq!(flags.len(), 7);
        assert!(flags.values().all(|hits| hits.len() == 3));
        assert_eq!(flags[ENGULFING_BULLISH], vec![false, true, false]);
        assert_eq!(flags[DOJI], vec![false, false, true]);
    }

    #[test]
    fn empty_series_yields_empty_flags() {
        let flags = CandlestickPatterns.detect(&[]).unwrap();
        assert!(flags.values().all(Vec::is_empty));
    }
}
