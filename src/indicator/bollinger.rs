use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::ma::Sma;
use crate::indicator::{Indicator, close_prices};
use crate::model::Candle;

/// Bollinger Bands around an SMA of close, using the population standard
/// deviation of each window.
pub struct BollingerBands {
    period: usize,
    std_dev_multiplier: f64,
}

impl BollingerBands {
    pub fn new(period: usize, std_dev_multiplier: f64) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        if std_dev_multiplier <= 0.0 {
            bail!(IndicatorError::InvalidParameter {
                name: "std_dev_multiplier must be > 0".into(),
            });
        }
        Ok(Self {
            period,
            std_dev_multiplier,
        })
    }

    /// Returns (upper, middle, lower) band values.
    pub fn calculate_bands(
        &self,
        candles: &[Candle],
    ) -> Result<Vec<(f64, f64, f64)>, Report<IndicatorError>> {
        let prices = close_prices(candles);
        let middles = Sma::new(self.period)?.calculate_prices(&prices)?;

        Ok(prices
            .windows(self.period)
            .zip(middles)
            .map(|(window, middle)| {
                let variance = window.iter().map(|&p| (p - middle).powi(2)).sum::<f64>()
                    / self.period as f64;
                let width = self.std_dev_multiplier * variance.sqrt();
                (middle + width, middle, middle - width)
            })
            .collect())
    }
}

impl Indicator for BollingerBands {
    fn name(&self) -> &str {
        "bollinger"
    }

    fn required_candles(&self) -> usize {
        self.period
    }

    /// Returns middle band (SMA) values only.
    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        Ok(self
            .calculate_bands(candles)?
            .into_iter()
            .map(|(_, m, _)| m)
            .collect())
    }
}
