use std::path::Path;

use error_stack::{Report, ResultExt};
use serde::Deserialize;

use crate::error::ConfigError;
use crate::levels::LevelSelection;
use crate::model::TimeFrame;

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "text".into()
}

fn default_timeframe() -> String {
    "15m".into()
}

fn default_sma_periods() -> Vec<usize> {
    vec![20, 50, 200]
}

fn default_ema_periods() -> Vec<usize> {
    vec![20]
}

fn default_rsi_period() -> usize {
    14
}

fn default_atr_period() -> usize {
    14
}

fn default_max_levels() -> usize {
    5
}

fn default_swing_window() -> usize {
    10
}

fn default_cluster_threshold() -> f64 {
    0.02
}

fn default_chart_window() -> usize {
    20
}

fn default_rsi_oversold() -> f64 {
    30.0
}

fn default_rsi_overbought() -> f64 {
    70.0
}

fn default_short_ma() -> String {
    "sma_20".into()
}

fn default_long_ma() -> String {
    "sma_50".into()
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub levels: LevelConfig,
    #[serde(default)]
    pub patterns: PatternConfig,
    #[serde(default)]
    pub signals: SignalConfig,
}

#[derive(Debug, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Accepted values: `"text"` | `"json"`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Interval of the analysed series, e.g. `"15m"`.
    #[serde(default = "default_timeframe")]
    pub timeframe: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            timeframe: default_timeframe(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct IndicatorConfig {
    #[serde(default = "default_sma_periods")]
    pub sma_periods: Vec<usize>,
    #[serde(default = "default_ema_periods")]
    pub ema_periods: Vec<usize>,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_atr_period")]
    pub atr_period: usize,
    #[serde(default)]
    pub macd: MacdConfig,
    #[serde(default)]
    pub bollinger: BollingerConfig,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            sma_periods: default_sma_periods(),
            ema_periods: default_ema_periods(),
            rsi_period: default_rsi_period(),
            atr_period: default_atr_period(),
            macd: MacdConfig::default(),
            bollinger: BollingerConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MacdConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    pub signal_period: usize,
}

impl Default for MacdConfig {
    fn default() -> Self {
        Self {
            fast_period: 12,
            slow_period: 26,
            signal_period: 9,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BollingerConfig {
    pub period: usize,
    pub std_dev_multiplier: f64,
}

impl Default for BollingerConfig {
    fn default() -> Self {
        Self {
            period: 20,
            std_dev_multiplier: 2.0,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct LevelConfig {
    /// Upper bound on the length of each support/resistance list.
    #[serde(default = "default_max_levels")]
    pub max_levels: usize,
    /// Which end of the ascending level list survives truncation.
    #[serde(default)]
    pub keep: LevelSelection,
    #[serde(default = "default_swing_window")]
    pub swing_window: usize,
    #[serde(default = "default_cluster_threshold")]
    pub cluster_threshold: f64,
}

impl Default for LevelConfig {
    fn default() -> Self {
        Self {
            max_levels: default_max_levels(),
            keep: LevelSelection::default(),
            swing_window: default_swing_window(),
            cluster_threshold: default_cluster_threshold(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PatternConfig {
    #[serde(default = "default_chart_window")]
    pub chart_window: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            chart_window: default_chart_window(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignalConfig {
    #[serde(default = "default_rsi_oversold")]
    pub rsi_oversold: f64,
    #[serde(default = "default_rsi_overbought")]
    pub rsi_overbought: f64,
    /// Indicator column used as the fast leg of the MA crossover.
    #[serde(default = "default_short_ma")]
    pub short_ma: String,
    /// Indicator column used as the slow leg of the MA crossover.
    #[serde(default = "default_long_ma")]
    pub long_ma: String,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            rsi_oversold: default_rsi_oversold(),
            rsi_overbought: default_rsi_overbought(),
            short_ma: default_short_ma(),
            long_ma: default_long_ma(),
        }
    }
}

impl AppConfig {
    /// Interval of the analysed series. Validated by [`load`].
    pub fn timeframe(&self) -> Option<TimeFrame> {
        TimeFrame::from_str(&self.general.timeframe)
    }
}

/// Load and validate an `AppConfig` from a TOML file at `path`.
pub fn load(path: &Path) -> Result<AppConfig, Report<ConfigError>> {
    let content = std::fs::read_to_string(path)
        .change_context(ConfigError::ReadFile)
        .attach_with(|| format!("path: {}", path.display()))?;

    let config: AppConfig = toml::from_str(&content).change_context(ConfigError::Parse {
        reason: "invalid TOML syntax or schema mismatch".into(),
    })?;

    validate(&config)?;

    Ok(config)
}

const VALID_LOG_FORMATS: &[&str] = &["text", "json"];

pub fn validate(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    validate_general(config)?;
    validate_indicators(&config.indicators)?;
    validate_levels(&config.levels)?;
    validate_patterns(&config.patterns)?;
    validate_signals(&config.signals)?;
    Ok(())
}

fn invalid(field: String) -> Report<ConfigError> {
    Report::new(ConfigError::Validation { field })
}

fn validate_general(config: &AppConfig) -> Result<(), Report<ConfigError>> {
    if config.timeframe().is_none() {
        return Err(invalid(format!(
            "general.timeframe: unknown timeframe \"{}\"",
            config.general.timeframe
        )));
    }
    if !VALID_LOG_FORMATS.contains(&config.general.log_format.as_str()) {
        return Err(invalid(format!(
            "general.log_format \"{}\" is not valid",
            config.general.log_format
        )));
    }
    Ok(())
}

fn validate_indicators(config: &IndicatorConfig) -> Result<(), Report<ConfigError>> {
    let periods = config
        .sma_periods
        .iter()
        .map(|p| ("indicators.sma_periods", *p))
        .chain(config.ema_periods.iter().map(|p| ("indicators.ema_periods", *p)))
        .chain([
            ("indicators.rsi_period", config.rsi_period),
            ("indicators.atr_period", config.atr_period),
            ("indicators.macd.fast_period", config.macd.fast_period),
            ("indicators.macd.slow_period", config.macd.slow_period),
            ("indicators.macd.signal_period", config.macd.signal_period),
            ("indicators.bollinger.period", config.bollinger.period),
        ]);
    for (field, period) in periods {
        if period == 0 {
            return Err(invalid(format!("{field}: period must be > 0")));
        }
    }

    if config.macd.fast_period >= config.macd.slow_period {
        return Err(invalid(
            "indicators.macd: fast_period must be < slow_period".into(),
        ));
    }
    if config.bollinger.std_dev_multiplier <= 0.0 {
        return Err(invalid(
            "indicators.bollinger.std_dev_multiplier must be > 0".into(),
        ));
    }
    Ok(())
}

fn validate_levels(config: &LevelConfig) -> Result<(), Report<ConfigError>> {
    if config.swing_window == 0 {
        return Err(invalid("levels.swing_window must be > 0".into()));
    }
    if config.cluster_threshold < 0.0 {
        return Err(invalid("levels.cluster_threshold must be >= 0".into()));
    }
    Ok(())
}

fn validate_patterns(config: &PatternConfig) -> Result<(), Report<ConfigError>> {
    if config.chart_window < 4 {
        return Err(invalid("patterns.chart_window must be >= 4".into()));
    }
    Ok(())
}

fn validate_signals(config: &SignalConfig) -> Result<(), Report<ConfigError>> {
    if config.rsi_oversold >= config.rsi_overbought {
        return Err(invalid(
            "signals: rsi_oversold must be < rsi_overbought".into(),
        ));
    }
    if config.short_ma == config.long_ma {
        return Err(invalid(format!(
            "signals: short_ma and long_ma both reference \"{}\"",
            config.short_ma
        )));
    }
    Ok(())
}
