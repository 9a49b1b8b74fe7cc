//! OHLCV loading from CSV.
//!
//! Expected header: `time,open,high,low,close,volume` (capitalised names as
//! exported by most market-data tools are accepted too). `time` is RFC 3339
//! or a plain `YYYY-MM-DD` date taken as midnight UTC. `volume` may be
//! omitted. Rows must be in strictly ascending time order.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use csv::{ReaderBuilder, Trim};
use error_stack::{Report, ResultExt, bail};
use serde::Deserialize;
use tracing::debug;

use crate::error::DataError;
use crate::model::Candle;

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(alias = "Time", alias = "Date", alias = "Datetime", alias = "date")]
    time: String,
    #[serde(alias = "Open")]
    open: f64,
    #[serde(alias = "High")]
    high: f64,
    #[serde(alias = "Low")]
    low: f64,
    #[serde(alias = "Close")]
    close: f64,
    #[serde(default, alias = "Volume")]
    volume: f64,
}

pub fn load_candles(path: &Path) -> Result<Vec<Candle>, Report<DataError>> {
    let file = File::open(path)
        .change_context(DataError::Open)
        .attach_with(|| format!("path: {}", path.display()))?;
    let candles = read_candles(file).attach_with(|| format!("path: {}", path.display()))?;
    debug!(path = %path.display(), candles = candles.len(), "price data loaded");
    Ok(candles)
}

/// Parse candles from any CSV source. Row numbers in errors count data rows
/// from 1, excluding the header.
pub fn read_candles(source: impl Read) -> Result<Vec<Candle>, Report<DataError>> {
    let mut reader = ReaderBuilder::new().trim(Trim::All).from_reader(source);
    let mut candles: Vec<Candle> = Vec::new();

    for (index, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = index + 1;
        let record = record.change_context(DataError::Record { row })?;
        let open_time = parse_time(&record.time).ok_or_else(|| {
            Report::new(DataError::Timestamp {
                row,
                value: record.time.clone(),
            })
        })?;

        if candles.last().is_some_and(|prev| prev.open_time >= open_time) {
            bail!(DataError::Ordering { row });
        }

        candles.push(Candle {
            open_time,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    Ok(candles)
}

fn parse_time(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(value) {
        return Some(time.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)
        .map(|time| time.and_utc())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parses_ohlcv_rows() {
        let csv = "\
time,open,high,low,close,volume
2024-01-01T00:00:00Z,2050.0,2055.5,2048.0,2052.3,1200
2024-01-01T00:15:00+00:00,2052.3,2060.0,2051.0,2058.8,900
";
        let candles = read_candles(csv.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[0].open_time,
            Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(candles[1].close, 2058.8);
        assert_eq!(candles[1].volume, 900.0);
    }

    #[test]
    fn accepts_capitalised_headers_and_plain_dates() {
        let csv = "\
Date,Open,High,Low,Close,Volume
2024-03-01,2040,2090,2035,2083,0
2024-03-04, 2083, 2120, 2080, 2114, 0
";
        let candles = read_candles(csv.as_bytes()).unwrap();
        assert_eq!(candles.len(), 2);
        assert_eq!(
            candles[1].open_time,
            Utc.with_ymd_and_hms(2024, 3, 4, 0, 0, 0).unwrap()
        );
        assert_eq!(candles[1].open, 2083.0);
    }

    #[test]
    fn bad_timestamp_reports_row() {
        let csv = "\
time,open,high,low,close,volume
2024-01-01T00:00:00Z,1,1,1,1,1
yesterday,1,1,1,1,1
";
        let report = read_candles(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            report.current_context(),
            DataError::Timestamp { row: 2, value } if value == "yesterday"
        ));
    }

    #[test]
    fn non_numeric_price_is_a_record_error() {
        let csv = "time,open,high,low,close,volume\n2024-01-01T00:00:00Z,1,abc,1,1,1\n";
        let report = read_candles(csv.as_bytes()).unwrap_err();
        assert!(matches!(report.current_context(), DataError::Record { row: 1 }));
    }

    #[test]
    fn out_of_order_rows_rejected() {
        let csv = "\
time,open,high,low,close,volume
2024-01-01T00:15:00Z,1,1,1,1,1
2024-01-01T00:00:00Z,1,1,1,1,1
";
        let report = read_candles(csv.as_bytes()).unwrap_err();
        assert!(matches!(report.current_context(), DataError::Ordering { row: 2 }));
    }

    #[test]
    fn missing_file_is_an_open_error() {
        let report = load_candles(Path::new("/nonexistent/prices.csv")).unwrap_err();
        assert!(matches!(report.current_context(), DataError::Open));
    }
}
