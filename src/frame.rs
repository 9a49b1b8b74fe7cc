use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::Candle;

pub const RSI: &str = "rsi";
pub const MACD: &str = "macd";
pub const MACD_SIGNAL: &str = "macd_signal";
pub const MACD_HIST: &str = "macd_hist";
pub const BB_UPPER: &str = "bb_upper";
pub const BB_MIDDLE: &str = "bb_middle";
pub const BB_LOWER: &str = "bb_lower";
pub const ATR: &str = "atr";

pub fn sma_column(period: usize) -> String {
    format!("sma_{period}")
}

pub fn ema_column(period: usize) -> String {
    format!("ema_{period}")
}

/// A price series together with named indicator columns.
///
/// Every column has exactly one slot per candle; `None` marks positions where
/// the indicator has no value yet (lookback not filled).
#[derive(Debug, Clone, Serialize)]
pub struct IndicatorFrame {
    candles: Vec<Candle>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl IndicatorFrame {
    pub fn new(candles: Vec<Candle>) -> Self {
        Self {
            candles,
            columns: BTreeMap::new(),
        }
    }

    pub fn candles(&self) -> &[Candle] {
        &self.candles
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    /// Insert a right-aligned indicator output as a full-length column.
    ///
    /// `values` holds the indicator's outputs for the last `values.len()`
    /// positions; earlier positions become `None`.
    pub fn insert_aligned(&mut self, name: impl Into<String>, values: Vec<f64>) {
        let column = align_series(self.candles.len(), values);
        self.columns.insert(name.into(), column);
    }

    /// Insert a column with no values at all.
    pub fn insert_empty(&mut self, name: impl Into<String>) {
        self.columns
            .insert(name.into(), vec![None; self.candles.len()]);
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns.get(name).map(Vec::as_slice)
    }

    /// Value of `name` at `index`, `None` if the column is absent or empty there.
    pub fn value(&self, name: &str, index: usize) -> Option<f64> {
        self.columns
            .get(name)
            .and_then(|column| column.get(index))
            .and_then(|value| *value)
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Latest non-missing value of every column.
    pub fn latest_values(&self) -> BTreeMap<String, f64> {
        self.columns
            .iter()
            .filter_map(|(name, column)| {
                column
                    .iter()
                    .rev()
                    .find_map(|value| *value)
                    .map(|value| (name.clone(), value))
            })
            .collect()
    }
}

fn align_series(total_len: usize, values: Vec<f64>) -> Vec<Option<f64>> {
    let offset = total_len.saturating_sub(values.len());
    let excess = values.len().saturating_sub(total_len);
    let mut output = vec![None; total_len];
    for (index, value) in values.into_iter().skip(excess).enumerate() {
        output[offset + index] = Some(value);
    }
    output
}
