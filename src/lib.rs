//! Technical analysis for gold price series: indicators, support and
//! resistance levels, candlestick and chart patterns, and trading signals.

pub mod analysis;
pub mod config;
pub mod data;
pub mod diagnostics;
pub mod error;
pub mod frame;
pub mod indicator;
pub mod levels;
pub mod model;
pub mod pattern;
pub mod signal;

pub use analysis::{AnalysisReport, Analyzer};
pub use config::AppConfig;
pub use diagnostics::{CollectingDiagnostics, Diagnostic, Diagnostics, TracingDiagnostics};
pub use frame::IndicatorFrame;
pub use levels::SupportResistance;
pub use model::{Candle, SignalAction, TimeFrame};
pub use pattern::PatternMap;
pub use signal::{SignalFrame, SignalRow};
