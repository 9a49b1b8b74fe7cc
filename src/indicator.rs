pub mod atr;
pub mod bollinger;
pub mod ma;
pub mod macd;
pub mod rsi;

use error_stack::Report;
use tracing::debug;

use crate::config::IndicatorConfig;
use crate::error::IndicatorError;
use crate::frame::{self, IndicatorFrame};
use crate::model::Candle;

use self::atr::Atr;
use self::bollinger::BollingerBands;
use self::ma::{Ema, Sma};
use self::macd::Macd;
use self::rsi::Rsi;

/// A technical analysis indicator that operates on a slice of candles.
///
/// Candles must be in ascending chronological order (oldest first).
pub trait Indicator: Send + Sync {
    /// Unique name of this indicator (e.g., "rsi", "sma").
    fn name(&self) -> &str;

    /// Minimum number of candles required to produce at least one output value.
    fn required_candles(&self) -> usize;

    /// Calculate indicator values from candles.
    ///
    /// Returns one value per output point. The number of values may be less
    /// than the number of input candles depending on the indicator's lookback;
    /// the last value always belongs to the last candle.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>>;
}

/// Extract close prices from a slice of candles.
pub fn close_prices(candles: &[Candle]) -> Vec<f64> {
    candles.iter().map(|c| c.close).collect()
}

/// The full indicator suite added to a series for the dashboard.
pub struct IndicatorSet {
    smas: Vec<(usize, Sma)>,
    emas: Vec<(usize, Ema)>,
    rsi: Rsi,
    macd: Macd,
    bollinger: BollingerBands,
    atr: Atr,
}

impl IndicatorSet {
    pub fn new(config: &IndicatorConfig) -> Result<Self, Report<IndicatorError>> {
        let smas = config
            .sma_periods
            .iter()
            .map(|&p| Sma::new(p).map(|sma| (p, sma)))
            .collect::<Result<Vec<_>, Report<IndicatorError>>>()?;
        let emas = config
            .ema_periods
            .iter()
            .map(|&p| Ema::new(p).map(|ema| (p, ema)))
            .collect::<Result<Vec<_>, Report<IndicatorError>>>()?;

        Ok(Self {
            smas,
            emas,
            rsi: Rsi::new(config.rsi_period)?,
            macd: Macd::new(
                config.macd.fast_period,
                config.macd.slow_period,
                config.macd.signal_period,
            )?,
            bollinger: BollingerBands::new(
                config.bollinger.period,
                config.bollinger.std_dev_multiplier,
            )?,
            atr: Atr::new(config.atr_period)?,
        })
    }

    /// Compute every indicator and return the series with the added columns.
    ///
    /// A series shorter than an indicator's lookback yields an all-`None`
    /// column for it rather than an error.
    pub fn apply(&self, candles: &[Candle]) -> Result<IndicatorFrame, Report<IndicatorError>> {
        let mut frame = IndicatorFrame::new(candles.to_vec());

        for (period, sma) in &self.smas {
            insert_single(&mut frame, frame::sma_column(*period), sma, candles)?;
        }
        for (period, ema) in &self.emas {
            insert_single(&mut frame, frame::ema_column(*period), ema, candles)?;
        }
        insert_single(&mut frame, frame::RSI.to_string(), &self.rsi, candles)?;

        match skip_short(self.macd.calculate_lines(candles))? {
            Some(lines) => {
                frame.insert_aligned(frame::MACD, lines.macd);
                frame.insert_aligned(frame::MACD_SIGNAL, lines.signal);
                frame.insert_aligned(frame::MACD_HIST, lines.histogram);
            }
            None => {
                debug!(indicator = "macd", candles = candles.len(), "series too short");
                for name in [frame::MACD, frame::MACD_SIGNAL, frame::MACD_HIST] {
                    frame.insert_empty(name);
                }
            }
        }

        match skip_short(self.bollinger.calculate_bands(candles))? {
            Some(bands) => {
                let (upper, middle, lower) = bands.into_iter().fold(
                    (Vec::new(), Vec::new(), Vec::new()),
                    |(mut u, mut m, mut l), (upper, middle, lower)| {
                        u.push(upper);
                        m.push(middle);
                        l.push(lower);
                        (u, m, l)
                    },
                );
                frame.insert_aligned(frame::BB_UPPER, upper);
                frame.insert_aligned(frame::BB_MIDDLE, middle);
                frame.insert_aligned(frame::BB_LOWER, lower);
            }
            None => {
                debug!(indicator = "bollinger", candles = candles.len(), "series too short");
                for name in [frame::BB_UPPER, frame::BB_MIDDLE, frame::BB_LOWER] {
                    frame.insert_empty(name);
                }
            }
        }

        insert_single(&mut frame, frame::ATR.to_string(), &self.atr, candles)?;

        Ok(frame)
    }
}

fn insert_single(
    frame: &mut IndicatorFrame,
    column: String,
    indicator: &dyn Indicator,
    candles: &[Candle],
) -> Result<(), Report<IndicatorError>> {
    match skip_short(indicator.calculate(candles))? {
        Some(values) => frame.insert_aligned(column, values),
        None => {
            debug!(
                indicator = indicator.name(),
                required = indicator.required_candles(),
                candles = candles.len(),
                "series too short"
            );
            frame.insert_empty(column);
        }
    }
    Ok(())
}

/// Turn `InsufficientData` into `Ok(None)`; every other failure propagates.
fn skip_short<T>(
    result: Result<T, Report<IndicatorError>>,
) -> Result<Option<T>, Report<IndicatorError>> {
    match result {
        Ok(values) => Ok(Some(values)),
        Err(report) if matches!(report.current_context(), IndicatorError::InsufficientData { .. }) => {
            Ok(None)
        }
        Err(report) => Err(report),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::candles_from_closes;

    fn ramp(n: usize) -> Vec<Candle> {
        let closes: Vec<f64> = (0..n).map(|i| 100.0 + i as f64).collect();
        candles_from_closes(&closes)
    }

    #[test]
    fn default_suite_produces_every_column() {
        let set = IndicatorSet::new(&IndicatorConfig::default()).unwrap();
        let frame = set.apply(&ramp(60)).unwrap();
        let names: Vec<&str> = frame.column_names().collect();
        for expected in [
            "sma_20",
            "sma_50",
            "sma_200",
            "ema_20",
            frame::RSI,
            frame::MACD,
            frame::MACD_SIGNAL,
            frame::MACD_HIST,
            frame::BB_UPPER,
            frame::BB_MIDDLE,
            frame::BB_LOWER,
            frame::ATR,
        ] {
            assert!(names.contains(&expected), "missing column {expected}");
        }
    }

    #[test]
    fn short_series_yields_empty_columns() {
        let set = IndicatorSet::new(&IndicatorConfig::default()).unwrap();
        let frame = set.apply(&ramp(60)).unwrap();
        assert!(frame.column("sma_200").unwrap().iter().all(Option::is_none));
        assert_eq!(frame.value("sma_50", 48), None);
        assert!(frame.value("sma_50", 49).is_some());
    }

    #[test]
    fn columns_are_aligned_to_the_last_candle() {
        let set = IndicatorSet::new(&IndicatorConfig::default()).unwrap();
        let frame = set.apply(&ramp(60)).unwrap();
        // sma_20 at position 59 averages closes 140..=159
        let expected = (140..=159).map(|v| v as f64).sum::<f64>() / 20.0;
        assert!((frame.value("sma_20", 59).unwrap() - expected).abs() < 1e-9);
        assert_eq!(frame.value("sma_20", 18), None);
    }

    #[test]
    fn empty_series_is_not_an_error() {
        let set = IndicatorSet::new(&IndicatorConfig::default()).unwrap();
        let frame = set.apply(&[]).unwrap();
        assert!(frame.is_empty());
        assert_eq!(frame.column("rsi").unwrap().len(), 0);
    }

    #[test]
    fn invalid_period_is_rejected_at_construction() {
        let config = IndicatorConfig {
            rsi_period: 0,
            ..IndicatorConfig::default()
        };
        assert!(IndicatorSet::new(&config).is_err());
    }
}
