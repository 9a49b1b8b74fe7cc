pub mod candlestick;
pub mod chart;

use std::collections::BTreeMap;

use error_stack::{Report, ResultExt};

use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::PatternError;
use crate::model::Candle;

/// Pattern name -> ascending positions where it was detected.
pub type PatternMap = BTreeMap<String, Vec<usize>>;

/// Pattern name -> one flag per candle.
pub type PatternFlags = BTreeMap<String, Vec<bool>>;

pub const DOJI: &str = "doji";
pub const HAMMER: &str = "hammer";
pub const SHOOTING_STAR: &str = "shooting_star";
pub const ENGULFING_BULLISH: &str = "engulfing_bullish";
pub const ENGULFING_BEARISH: &str = "engulfing_bearish";
pub const MORNING_STAR: &str = "morning_star";
pub const EVENING_STAR: &str = "evening_star";

pub const DOUBLE_TOP: &str = "double_top";
pub const DOUBLE_BOTTOM: &str = "double_bottom";
pub const HEAD_AND_SHOULDERS: &str = "head_and_shoulders";
pub const INVERSE_HEAD_AND_SHOULDERS: &str = "inverse_head_and_shoulders";

/// Candlestick patterns reported to the dashboard.
pub const CANDLESTICK_PATTERNS: [&str; 7] = [
    DOJI,
    HAMMER,
    SHOOTING_STAR,
    ENGULFING_BULLISH,
    ENGULFING_BEARISH,
    MORNING_STAR,
    EVENING_STAR,
];

/// Chart patterns reported to the dashboard.
pub const CHART_PATTERNS: [&str; 4] = [
    DOUBLE_TOP,
    DOUBLE_BOTTOM,
    HEAD_AND_SHOULDERS,
    INVERSE_HEAD_AND_SHOULDERS,
];

/// A pattern recogniser producing per-candle flags.
///
/// Implementations may emit any names; callers filter to the names they know.
pub trait PatternDetector: Send + Sync {
    fn name(&self) -> &str;

    fn detect(&self, candles: &[Candle]) -> Result<PatternFlags, Report<PatternError>>;
}

/// Keep the allow-listed names that were detected at least once and turn
/// their flags into positions.
pub fn to_pattern_map(flags: &PatternFlags, allowed: &[&str]) -> PatternMap {
    allowed
        .iter()
        .filter_map(|&name| {
            let positions: Vec<usize> = flags
                .get(name)?
                .iter()
                .enumerate()
                .filter_map(|(i, &hit)| hit.then_some(i))
                .collect();
            (!positions.is_empty()).then(|| (name.to_string(), positions))
        })
        .collect()
}

pub fn identify_candlestick_patterns(
    detector: &dyn PatternDetector,
    candles: &[Candle],
) -> Result<PatternMap, Report<PatternError>> {
    let flags = detector
        .detect(candles)
        .change_context(PatternError::Candlestick)
        .attach_with(|| format!("detector: {}", detector.name()))?;
    Ok(to_pattern_map(&flags, &CANDLESTICK_PATTERNS))
}

pub fn identify_chart_patterns(
    detector: &dyn PatternDetector,
    candles: &[Candle],
) -> Result<PatternMap, Report<PatternError>> {
    let flags = detector
        .detect(candles)
        .change_context(PatternError::Chart)
        .attach_with(|| format!("detector: {}", detector.name()))?;
    Ok(to_pattern_map(&flags, &CHART_PATTERNS))
}

/// Ordered merge: candlestick entries first, then chart entries, which
/// replace candlestick entries of the same name.
pub fn merge_patterns(candlestick: PatternMap, chart: PatternMap) -> PatternMap {
    let mut merged = PatternMap::new();
    for (name, positions) in candlestick {
        merged.insert(name, positions);
    }
    for (name, positions) in chart {
        merged.insert(name, positions);
    }
    merged
}

/// Candlestick and chart patterns together, failing if either detector fails.
pub fn try_identify_patterns(
    candlestick: &dyn PatternDetector,
    chart: &dyn PatternDetector,
    candles: &[Candle],
) -> Result<PatternMap, Report<PatternError>> {
    let candlestick_patterns = identify_candlestick_patterns(candlestick, candles)?;
    let chart_patterns = identify_chart_patterns(chart, candles)?;
    Ok(merge_patterns(candlestick_patterns, chart_patterns))
}

/// Candlestick and chart patterns together, degrading to an empty map.
///
/// A detector failure is sent to `diagnostics` and an empty map is returned,
/// so an empty result means either "nothing found" or "detection failed".
/// Use [`try_identify_patterns`] to tell the two apart.
pub fn identify_patterns(
    candlestick: &dyn PatternDetector,
    chart: &dyn PatternDetector,
    candles: &[Candle],
    diagnostics: &dyn Diagnostics,
) -> PatternMap {
    match try_identify_patterns(candlestick, chart, candles) {
        Ok(patterns) => patterns,
        Err(report) => {
            diagnostics.report(Diagnostic {
                source: "identify_patterns",
                message: format!("error identifying patterns: {report:?}"),
            });
            PatternMap::new()
        }
    }
}
