use error_stack::{Report, bail};
use serde::Serialize;
use tracing::debug;

use crate::config::SignalConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::SignalError;
use crate::frame::{self, IndicatorFrame};
use crate::model::SignalAction;

/// Number of voting rules; the strength scale divides by it.
const RULE_COUNT: f64 = 4.0;

/// Combined signal at one position of the series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignalRow {
    pub action: SignalAction,
    pub rsi_vote: i8,
    pub macd_vote: i8,
    pub bollinger_vote: i8,
    pub ma_vote: i8,
    /// 1..=10, proportional to how many rules agree.
    pub strength: f64,
    /// Rules that voted in the direction of `action`, in rule order.
    pub reasons: Vec<&'static str>,
}

impl SignalRow {
    fn from_votes(rsi: i8, macd: i8, bollinger: i8, ma: i8) -> Self {
        let sum = i32::from(rsi) + i32::from(macd) + i32::from(bollinger) + i32::from(ma);
        let action = SignalAction::from_vote(sum);
        let strength = (f64::from(sum.abs()) / RULE_COUNT * 10.0)
            .round_ties_even()
            .clamp(1.0, 10.0);

        let rules: [(i8, &'static str, &'static str); 4] = [
            (rsi, "RSI oversold", "RSI overbought"),
            (macd, "MACD bullish crossover", "MACD bearish crossover"),
            (bollinger, "Price below lower BB", "Price above upper BB"),
            (ma, "MA bullish crossover", "MA bearish crossover"),
        ];
        let reasons = rules
            .iter()
            .filter_map(|&(vote, bullish, bearish)| match (action, vote) {
                (SignalAction::Buy, 1) => Some(bullish),
                (SignalAction::Sell, -1) => Some(bearish),
                _ => None,
            })
            .collect();

        Self {
            action,
            rsi_vote: rsi,
            macd_vote: macd,
            bollinger_vote: bollinger,
            ma_vote: ma,
            strength,
            reasons,
        }
    }
}

/// An indicator frame with one [`SignalRow`] per candle.
#[derive(Debug, Clone, Serialize)]
pub struct SignalFrame {
    pub frame: IndicatorFrame,
    pub rows: Vec<SignalRow>,
}

impl SignalFrame {
    pub fn latest(&self) -> Option<&SignalRow> {
        self.rows.last()
    }
}

pub struct SignalGenerator {
    rsi_oversold: f64,
    rsi_overbought: f64,
    short_ma: String,
    long_ma: String,
}

impl SignalGenerator {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            rsi_oversold: config.rsi_oversold,
            rsi_overbought: config.rsi_overbought,
            short_ma: config.short_ma.clone(),
            long_ma: config.long_ma.clone(),
        }
    }

    /// Vote every position of `frame` and attach the combined signals.
    ///
    /// The `rsi` column is mandatory. Any other missing column silences its
    /// rule for the whole series and is sent to `diagnostics`.
    pub fn generate(
        &self,
        frame: IndicatorFrame,
        diagnostics: &dyn Diagnostics,
    ) -> Result<SignalFrame, Report<SignalError>> {
        if frame.column(frame::RSI).is_none() {
            bail!(SignalError::MissingColumn {
                column: frame::RSI.to_string(),
            });
        }

        let macd_available = has_columns(&frame, &[frame::MACD, frame::MACD_SIGNAL], diagnostics);
        let bollinger_available =
            has_columns(&frame, &[frame::BB_UPPER, frame::BB_LOWER], diagnostics);
        let ma_available = has_columns(
            &frame,
            &[self.short_ma.as_str(), self.long_ma.as_str()],
            diagnostics,
        );

        let rows: Vec<SignalRow> = (0..frame.len())
            .map(|i| {
                let rsi = self.rsi_vote(&frame, i);
                let macd = if macd_available {
                    cross_vote(&frame, frame::MACD, frame::MACD_SIGNAL, i)
                } else {
                    0
                };
                let bollinger = if bollinger_available {
                    bollinger_vote(&frame, i)
                } else {
                    0
                };
                let ma = if ma_available {
                    cross_vote(&frame, &self.short_ma, &self.long_ma, i)
                } else {
                    0
                };
                SignalRow::from_votes(rsi, macd, bollinger, ma)
            })
            .collect();

        debug!(
            rows = rows.len(),
            buys = rows.iter().filter(|r| r.action == SignalAction::Buy).count(),
            sells = rows.iter().filter(|r| r.action == SignalAction::Sell).count(),
            "signals generated"
        );

        Ok(SignalFrame { frame, rows })
    }

    fn rsi_vote(&self, frame: &IndicatorFrame, i: usize) -> i8 {
        match frame.value(frame::RSI, i) {
            Some(rsi) if rsi < self.rsi_oversold => 1,
            Some(rsi) if rsi > self.rsi_overbought => -1,
            _ => 0,
        }
    }
}

/// Whether every column is present; reports the missing ones otherwise.
fn has_columns(frame: &IndicatorFrame, columns: &[&str], diagnostics: &dyn Diagnostics) -> bool {
    let missing: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|name| frame.column(name).is_none())
        .collect();
    if missing.is_empty() {
        return true;
    }
    diagnostics.report(Diagnostic {
        source: "generate_signals",
        message: format!("missing columns {missing:?}, rule skipped"),
    });
    false
}

/// +1 when `fast` crosses above `slow` at `i`, -1 when it crosses below.
fn cross_vote(frame: &IndicatorFrame, fast: &str, slow: &str, i: usize) -> i8 {
    let Some(prev) = i.checked_sub(1) else {
        return 0;
    };
    let values = (
        frame.value(fast, prev),
        frame.value(slow, prev),
        frame.value(fast, i),
        frame.value(slow, i),
    );
    let (Some(prev_fast), Some(prev_slow), Some(fast), Some(slow)) = values else {
        return 0;
    };
    if fast > slow && prev_fast <= prev_slow {
        1
    } else if fast < slow && prev_fast >= prev_slow {
        -1
    } else {
        0
    }
}

fn bollinger_vote(frame: &IndicatorFrame, i: usize) -> i8 {
    let close = frame.candles()[i].close;
    if frame.value(frame::BB_LOWER, i).is_some_and(|lower| close < lower) {
        1
    } else if frame.value(frame::BB_UPPER, i).is_some_and(|upper| close > upper) {
        -1
    } else {
        0
    }
}
