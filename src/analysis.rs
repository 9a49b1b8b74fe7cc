//! The analysis surface consumed by the dashboard: one [`Analyzer`] built
//! from config exposes each step separately and [`Analyzer::analyze`] runs
//! them all into an [`AnalysisReport`].

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use error_stack::{Report, ResultExt};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::{self, AppConfig};
use crate::diagnostics::{Diagnostics, TracingDiagnostics};
use crate::error::{AnalysisError, IndicatorError, PatternError, SignalError};
use crate::frame::IndicatorFrame;
use crate::indicator::IndicatorSet;
use crate::levels::{self, LevelSelection, PivotPoints, SupportResistance};
use crate::model::{Candle, TimeFrame};
use crate::pattern::candlestick::CandlestickPatterns;
use crate::pattern::chart::{ChartPatterns, Trend};
use crate::pattern::{self, PatternDetector, PatternMap};
use crate::signal::{SignalFrame, SignalGenerator, SignalRow};

pub struct Analyzer {
    timeframe: TimeFrame,
    indicators: IndicatorSet,
    signals: SignalGenerator,
    max_levels: usize,
    keep: LevelSelection,
    swing_window: usize,
    cluster_threshold: f64,
    candlestick: Box<dyn PatternDetector>,
    chart: Box<dyn PatternDetector>,
    trend: ChartPatterns,
    diagnostics: Arc<dyn Diagnostics>,
}

/// Everything the dashboard shows for one series.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub report_id: Uuid,
    pub timeframe: &'static str,
    pub timeframe_label: &'static str,
    pub generated_at: DateTime<Utc>,
    pub candles: usize,
    pub latest_time: Option<DateTime<Utc>>,
    pub latest_close: Option<f64>,
    /// Latest available value of every indicator column.
    pub indicators: BTreeMap<String, f64>,
    pub signal: Option<SignalRow>,
    pub support_resistance: SupportResistance,
    pub swing_levels: SupportResistance,
    pub pivots: Option<PivotPoints>,
    pub patterns: PatternMap,
    pub trend: Option<Trend>,
}

impl Analyzer {
    /// Build with the built-in detectors and diagnostics forwarded to tracing.
    pub fn new(config: &AppConfig) -> Result<Self, Report<AnalysisError>> {
        config::validate(config).change_context(AnalysisError::Setup)?;
        let timeframe = config
            .timeframe()
            .ok_or_else(|| Report::new(AnalysisError::Setup))
            .attach_with(|| format!("timeframe: {}", config.general.timeframe))?;
        let indicators =
            IndicatorSet::new(&config.indicators).change_context(AnalysisError::Setup)?;
        let window = config.patterns.chart_window;
        let chart = ChartPatterns::new(window).change_context(AnalysisError::Setup)?;
        let trend = ChartPatterns::new(window).change_context(AnalysisError::Setup)?;

        Ok(Self {
            timeframe,
            indicators,
            signals: SignalGenerator::new(&config.signals),
            max_levels: config.levels.max_levels,
            keep: config.levels.keep,
            swing_window: config.levels.swing_window,
            cluster_threshold: config.levels.cluster_threshold,
            candlestick: Box::new(CandlestickPatterns),
            chart: Box::new(chart),
            trend,
            diagnostics: Arc::new(TracingDiagnostics),
        })
    }

    /// Replace the pattern recognisers.
    pub fn with_detectors(
        mut self,
        candlestick: Box<dyn PatternDetector>,
        chart: Box<dyn PatternDetector>,
    ) -> Self {
        self.candlestick = candlestick;
        self.chart = chart;
        self
    }

    /// Send swallowed failures to `diagnostics` instead of the log.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    pub fn timeframe(&self) -> TimeFrame {
        self.timeframe
    }

    pub fn add_indicators(&self, candles: &[Candle]) -> Result<IndicatorFrame, Report<IndicatorError>> {
        self.indicators.apply(candles)
    }

    pub fn identify_support_resistance(&self, candles: &[Candle]) -> SupportResistance {
        levels::identify_support_resistance(candles, self.max_levels, self.keep)
    }

    pub fn identify_swing_levels(&self, candles: &[Candle]) -> SupportResistance {
        levels::swing_levels(candles, self.swing_window, self.cluster_threshold)
    }

    pub fn identify_candlestick_patterns(
        &self,
        candles: &[Candle],
    ) -> Result<PatternMap, Report<PatternError>> {
        pattern::identify_candlestick_patterns(self.candlestick.as_ref(), candles)
    }

    pub fn identify_chart_patterns(
        &self,
        candles: &[Candle],
    ) -> Result<PatternMap, Report<PatternError>> {
        pattern::identify_chart_patterns(self.chart.as_ref(), candles)
    }

    /// Merged pattern map; an empty map also stands for a detector failure,
    /// which is sent to the diagnostics sink.
    pub fn identify_patterns(&self, candles: &[Candle]) -> PatternMap {
        pattern::identify_patterns(
            self.candlestick.as_ref(),
            self.chart.as_ref(),
            candles,
            self.diagnostics.as_ref(),
        )
    }

    pub fn try_identify_patterns(&self, candles: &[Candle]) -> Result<PatternMap, Report<PatternError>> {
        pattern::try_identify_patterns(self.candlestick.as_ref(), self.chart.as_ref(), candles)
    }

    pub fn generate_signals(&self, frame: IndicatorFrame) -> Result<SignalFrame, Report<SignalError>> {
        self.signals.generate(frame, self.diagnostics.as_ref())
    }

    pub fn trend(&self, candles: &[Candle]) -> Vec<Trend> {
        self.trend.trend(candles)
    }

    /// Run the full dashboard flow over `candles`.
    pub fn analyze(&self, candles: &[Candle]) -> Result<AnalysisReport, Report<AnalysisError>> {
        let frame = self
            .add_indicators(candles)
            .change_context(AnalysisError::Indicators)?;
        let indicators = frame.latest_values();
        let signals = self
            .generate_signals(frame)
            .change_context(AnalysisError::Signals)?;

        let report = AnalysisReport {
            report_id: Uuid::new_v4(),
            timeframe: self.timeframe.as_str(),
            timeframe_label: self.timeframe.label(),
            generated_at: Utc::now(),
            candles: candles.len(),
            latest_time: candles.last().map(|c| c.open_time),
            latest_close: candles.last().map(|c| c.close),
            indicators,
            signal: signals.latest().cloned(),
            support_resistance: self.identify_support_resistance(candles),
            swing_levels: self.identify_swing_levels(candles),
            pivots: levels::pivot_points(candles),
            patterns: self.identify_patterns(candles),
            trend: self.trend(candles).last().copied(),
        };

        info!(
            report_id = %report.report_id,
            timeframe = report.timeframe,
            candles = report.candles,
            action = ?report.signal.as_ref().map(|s| s.action),
            patterns = report.patterns.len(),
            "analysis complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::CollectingDiagnostics;
    use crate::model::fixtures::candle;
    use crate::pattern::DOJI;
    use crate::pattern::stubs::{FailingDetector, FixedDetector, flags};

    fn wave(n: usize) -> Vec<Candle> {
        (0..n)
            .map(|i| {
                let x = i as f64;
                let close = 2000.0 + 25.0 * (x / 6.0).sin() + 0.2 * x;
                let open = close - 2.0 * (x / 3.0).cos();
                candle(i, open, open.max(close) + 1.5, open.min(close) - 1.5, close)
            })
            .collect()
    }

    fn analyzer() -> Analyzer {
        Analyzer::new(&AppConfig::default()).unwrap()
    }

    #[test]
    fn full_report_on_long_series() {
        let candles = wave(260);
        let report = analyzer().analyze(&candles).unwrap();

        assert_eq!(report.candles, 260);
        assert_eq!(report.timeframe, "15m");
        assert_eq!(report.latest_close, Some(candles[259].close));
        for column in ["sma_20", "sma_50", "sma_200", "ema_20", "rsi", "macd", "bb_upper", "atr"] {
            assert!(report.indicators.contains_key(column), "{column}");
        }
        let signal = report.signal.as_ref().unwrap();
        assert!((1.0..=10.0).contains(&signal.strength));
        assert!(report.support_resistance.support.len() <= 5);
        assert!(report.support_resistance.resistance.len() <= 5);
        assert!(!report.support_resistance.support.is_empty());
        assert!(report.pivots.is_some());
        assert!(report.trend.is_some());

        let json = serde_json::to_value(&report).unwrap();
        assert!(json["report_id"].is_string());
        assert_eq!(json["timeframe_label"], "15 Minutes");
    }

    #[test]
    fn short_series_leaves_long_lookbacks_empty() {
        let report = analyzer().analyze(&wave(30)).unwrap();
        assert!(report.indicators.contains_key("sma_20"));
        assert!(!report.indicators.contains_key("sma_50"));
        assert!(!report.indicators.contains_key("sma_200"));
        assert!(report.signal.is_some());
    }

    #[test]
    fn empty_series_produces_empty_report() {
        let report = analyzer().analyze(&[]).unwrap();
        assert_eq!(report.candles, 0);
        assert!(report.latest_close.is_none());
        assert!(report.signal.is_none());
        assert!(report.patterns.is_empty());
        assert!(report.pivots.is_none());
        assert_eq!(report.support_resistance, SupportResistance::default());
    }

    #[test]
    fn detector_failure_degrades_and_is_reported() {
        let sink = Arc::new(CollectingDiagnostics::new());
        let analyzer = analyzer()
            .with_detectors(Box::new(FailingDetector), Box::new(FailingDetector))
            .with_diagnostics(sink.clone());
        let candles = wave(40);

        assert!(analyzer.identify_patterns(&candles).is_empty());
        assert!(analyzer.try_identify_patterns(&candles).is_err());
        assert!(analyzer.identify_candlestick_patterns(&candles).is_err());

        let report = analyzer.analyze(&candles).unwrap();
        assert!(report.patterns.is_empty());
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn injected_detectors_are_filtered_and_merged() {
        let analyzer = analyzer().with_detectors(
            Box::new(FixedDetector(flags(&[(DOJI, &[false, true])]))),
            Box::new(FixedDetector(flags(&[(DOJI, &[true, false])]))),
        );
        let candles = wave(2);
        assert_eq!(analyzer.identify_candlestick_patterns(&candles).unwrap()[DOJI], vec![1]);
        // doji is not a chart pattern name
        assert!(analyzer.identify_chart_patterns(&candles).unwrap().is_empty());
        assert_eq!(analyzer.identify_patterns(&candles)[DOJI], vec![1]);
    }

    #[test]
    fn invalid_chart_window_fails_setup() {
        let mut config = AppConfig::default();
        config.patterns.chart_window = 2;
        let report = Analyzer::new(&config).err().unwrap();
        assert!(matches!(report.current_context(), AnalysisError::Setup));
    }

    #[test]
    fn indicator_and_signal_steps_compose() {
        let analyzer = analyzer();
        let candles = wave(80);
        let frame = analyzer.add_indicators(&candles).unwrap();
        assert_eq!(frame.len(), 80);
        let signals = analyzer.generate_signals(frame).unwrap();
        assert_eq!(signals.rows.len(), 80);
    }

    #[test]
    fn zero_swing_window_fails_setup() {
        let mut config = AppConfig::default();
        config.levels.swing_window = 0;
        let report = Analyzer::new(&config).err().unwrap();
        assert!(matches!(report.current_context(), AnalysisError::Setup));
    }

    #[test]
    fn flat_series_reads_as_overbought() {
        let analyzer = analyzer();
        let candles = crate::model::fixtures::candles_from_closes(&[2000.0; 30]);
        let frame = analyzer.add_indicators(&candles).unwrap();
        assert_eq!(frame.value("rsi", 29), Some(100.0));

        let signals = analyzer.generate_signals(frame).unwrap();
        let latest = signals.latest().unwrap();
        assert_eq!(latest.rsi_vote, -1);
        assert_eq!(latest.action, crate::model::SignalAction::Sell);
        assert_eq!(latest.strength, 2.0);
        assert_eq!(latest.reasons, vec!["RSI overbought"]);
    }
}
