use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::{Indicator, close_prices};
use crate::model::Candle;

fn check_period(period: usize) -> Result<(), Report<IndicatorError>> {
    if period == 0 {
        bail!(IndicatorError::InvalidParameter {
            name: "period must be > 0".into(),
        });
    }
    Ok(())
}

fn check_len(period: usize, available: usize) -> Result<(), Report<IndicatorError>> {
    if available < period {
        bail!(IndicatorError::InsufficientData {
            required: period,
            available,
        });
    }
    Ok(())
}

/// Simple Moving Average of close.
pub struct Sma {
    period: usize,
}

impl Sma {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period(period)?;
        Ok(Self { period })
    }

    /// Rolling mean over `prices`, one value per full window.
    pub fn calculate_prices(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        check_len(self.period, prices.len())?;

        let n = self.period as f64;
        let mut sum: f64 = prices[..self.period].iter().sum();
        let mut results = Vec::with_capacity(prices.len() - self.period + 1);
        results.push(sum / n);
        for (entering, leaving) in prices[self.period..].iter().zip(prices) {
            sum += entering - leaving;
            results.push(sum / n);
        }
        Ok(results)
    }
}

impl Indicator for Sma {
    fn name(&self) -> &str {
        "sma"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_prices(&close_prices(candles))
    }
}

/// Exponential Moving Average of close, seeded with the SMA of the first
/// `period` prices.
pub struct Ema {
    period: usize,
}

impl Ema {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        check_period(period)?;
        Ok(Self { period })
    }

    pub fn calculate_prices(&self, prices: &[f64]) -> Result<Vec<f64>, Report<IndicatorError>> {
        check_len(self.period, prices.len())?;

        let k = 2.0 / (self.period as f64 + 1.0);
        let mut ema = prices[..self.period].iter().sum::<f64>() / self.period as f64;
        let mut results = Vec::with_capacity(prices.len() - self.period + 1);
        results.push(ema);

        for &price in &prices[self.period..] {
            ema = price * k + ema * (1.0 - k);
            results.push(ema);
        }

        Ok(results)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        "ema"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        self.calculate_prices(&close_prices(candles))
    }
}
