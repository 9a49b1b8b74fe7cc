use derive_more::{Display, Error};

#[derive(Debug, Display, Error)]
pub enum ConfigError {
    #[display("failed to read config file")]
    ReadFile,
    #[display("failed to parse config: {reason}")]
    Parse { reason: String },
    #[display("invalid config: {field}")]
    Validation { field: String },
}

#[derive(Debug, Display, Error)]
pub enum DataError {
    #[display("failed to open price data")]
    Open,
    #[display("malformed price record at row {row}")]
    Record { row: usize },
    #[display("invalid timestamp at row {row}: {value}")]
    Timestamp { row: usize, value: String },
    #[display("price data is not in ascending time order at row {row}")]
    Ordering { row: usize },
}

#[derive(Debug, Display, Error)]
pub enum IndicatorError {
    #[display("insufficient data: need {required}, got {available}")]
    InsufficientData { required: usize, available: usize },
    #[display("invalid parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum PatternError {
    #[display("candlestick detection failed")]
    Candlestick,
    #[display("chart pattern detection failed")]
    Chart,
    #[display("invalid detector parameter: {name}")]
    InvalidParameter { name: String },
}

#[derive(Debug, Display, Error)]
pub enum SignalError {
    #[display("missing indicator column: {column}")]
    MissingColumn { column: String },
}

#[derive(Debug, Display, Error)]
pub enum AnalysisError {
    #[display("failed to build analyzer")]
    Setup,
    #[display("indicator computation failed")]
    Indicators,
    #[display("signal generation failed")]
    Signals,
}
