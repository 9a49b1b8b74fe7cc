use error_stack::{Report, bail};

use crate::error::IndicatorError;
use crate::indicator::Indicator;
use crate::model::Candle;

/// Average True Range with Wilder smoothing.
///
/// True range needs the previous close, so the first candle only seeds it and
/// the first ATR value lands on candle `period`.
pub struct Atr {
    period: usize,
}

impl Atr {
    pub fn new(period: usize) -> Result<Self, Report<IndicatorError>> {
        if period == 0 {
            bail!(IndicatorError::InvalidParameter {
                name: "period must be > 0".into(),
            });
        }
        Ok(Self { period })
    }
}

/// True range of each candle against its predecessor's close.
pub fn true_ranges(candles: &[Candle]) -> Vec<f64> {
    candles
        .windows(2)
        .map(|w| {
            let (prev, cur) = (&w[0], &w[1]);
            cur.range()
                .max((cur.high - prev.close).abs())
                .max((cur.low - prev.close).abs())
        })
        .collect()
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        "atr"
    }

    fn required_candles(&self) -> usize {
        self.period + 1
    }

    fn calculate(&self, candles: &[Candle]) -> Result<Vec<f64>, Report<IndicatorError>> {
        if candles.len() < self.required_candles() {
            bail!(IndicatorError::InsufficientData {
                required: self.required_candles(),
                available: candles.len(),
            });
        }

        let period = self.period as f64;
        let ranges = true_ranges(candles);
        let (seed, rest) = ranges.split_at(self.period);

        let mut atr = seed.iter().sum::<f64>() / period;
        let mut results = Vec::with_capacity(rest.len() + 1);
        results.push(atr);
        for &tr in rest {
            atr = (atr * (period - 1.0) + tr) / period;
            results.push(atr);
        }
        Ok(results)
    }
}
