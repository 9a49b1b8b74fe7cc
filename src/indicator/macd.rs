use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::Ema;
use crate::indicator::{Indicator, close_prices};
use crate::model::Candle;

/// MACD line, signal line and histogram.
///
/// Each vector is right-aligned to the input: its last element belongs to the
/// last candle. `macd` is longer than `signal`/`histogram` by
/// `signal_period - 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct MacdLines {
    pub macd: Vec<f64>,
    pub signal: Vec<f64>,
    pub histogram: Vec<f64>,
}

pub struct Macd {
    fast_period: usize,
    slow_period: usize,
    signal_period: usize,
}

impl Macd {
    pub fn new(
        fast_period: usize,
        slow_period: usize,
        signal_period: usize,
    ) -> Result<Self, Report<IndicatorError>> {
        if fast_period == 0 || slow_period == 0 || signal_period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "all periods must be > 0".into(),
            });
        }
        if fast_period >= slow_period {
            bail!(IndicatorError::InvalidParameter {
                name: "fast_period must be < slow_period".into(),
            });
        }
        Ok(Self {
            fast_period,
            slow_period,
            signal_period,
        })
    }

    pub fn calculate_lines(&self, candles: &[Candle]) -> Result<MacdLines, Report<IndicatorError>> {
        let prices = close_prices(candles);
        if prices.len() < self.required_candles() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_candles(),
                available: prices.len(),
            });
        }

        let fast_ema = Ema::new(self.fast_period)?.calculate_prices(&prices)?;
        let slow_ema = Ema::new(self.slow_period)?.calculate_prices(&prices)?;

        // fast_ema starts (slow - fast) candles earlier than slow_ema
        let offset = self.slow_period - self.fast_period;
        let macd: Vec<f64> = fast_ema[offset..]
            .iter()
            .zip(&slow_ema)
            .map(|(f, s)| f - s)
            .collect();

        let signal = Ema::new(self.signal_period)?.calculate_prices(&macd)?;
        let histogram = macd[self.signal_period - 1..]
            .iter()
            .zip(&signal)
            .map(|(m, s)| m - s)
            .collect();

        Ok(MacdLines {
            macd,
            signal,
            histogram,
        })
    }
}

impl Indicator for Macd {
    fn name(&self) -> &str {
        "macd"
    }

    fn required_candles(&self) -> usize {
        self.slow_period + self.signal_period - 1
    }

    /// Returns MACD line values only.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        Ok(self.calculate_lines(candles)?.macd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::candles_from_closes;

    #[test]
    fn macd_invalid_fast_ge_slow() {
        assert!(Macd::new(26, 12, 9).is_err());
        assert!(Macd::new(12, 12, 9).is_err());
    }

    #[test]
    fn macd_period_zero_invalid() {
        assert!(Macd::new(0, 26, 9).is_err());
    }

    #[test]
    fn macd_insufficient_data() {
        let macd = Macd::new(12, 26, 9).unwrap();
        assert!(macd.calculate(&candles_from_closes(&[1.0; 33])).is_err());
        assert!(macd.calculate(&candles_from_closes(&[1.0; 34])).is_ok());
    }

    #[test]
    fn macd_flat_prices_return_zero() {
        let macd = Macd::new(3, 5, 3).unwrap();
        let lines = macd.calculate_lines(&candles_from_closes(&[10.0; 10])).unwrap();
        for v in lines.macd.iter().chain(&lines.signal).chain(&lines.histogram) {
            assert!(v.abs() < 1e-9, "expected 0 for flat prices, got {v}");
        }
    }

    #[test]
    fn macd_line_lengths() {
        let macd = Macd::new(3, 5, 3).unwrap();
        let closes: Vec<f64> = (1..=12).map(|i| i as f64).collect();
        let lines = macd.calculate_lines(&candles_from_closes(&closes)).unwrap();
        // 12 - 5 + 1 = 8 MACD values, 8 - 3 + 1 = 6 signal values
        assert_eq!(lines.macd.len(), 8);
        assert_eq!(lines.signal.len(), 6);
        assert_eq!(lines.histogram.len(), 6);
    }

    #[test]
    fn macd_positive_in_uptrend() {
        let macd = Macd::new(3, 5, 3).unwrap();
        let closes: Vec<f64> = (1..=12).map(|i| (i * i) as f64).collect();
        let values = macd.calculate(&candles_from_closes(&closes)).unwrap();
        assert!(values.iter().all(|v| *v > 0.0));
    }
}
