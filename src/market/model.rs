use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::AppError;

/// Kline intervals accepted by the Binance spot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interval {
    OneMinute,
    ThreeMinutes,
    FiveMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    OneHour,
    TwoHours,
    FourHours,
    SixHours,
    EightHours,
    TwelveHours,
    OneDay,
    ThreeDays,
    OneWeek,
    OneMonth,
}

/// Coarse bucket size of an interval, used to pick the display format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Minute,
    Hour,
    Day,
}

impl Interval {
    pub const ALL: [Interval; 15] = [
        Interval::OneMinute,
        Interval::ThreeMinutes,
        Interval::FiveMinutes,
        Interval::FifteenMinutes,
        Interval::ThirtyMinutes,
        Interval::OneHour,
        Interval::TwoHours,
        Interval::FourHours,
        Interval::SixHours,
        Interval::EightHours,
        Interval::TwelveHours,
        Interval::OneDay,
        Interval::ThreeDays,
        Interval::OneWeek,
        Interval::OneMonth,
    ];

    /// Wire code, e.g. `1h` or `1M`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::OneMinute => "1m",
            Interval::ThreeMinutes => "3m",
            Interval::FiveMinutes => "5m",
            Interval::FifteenMinutes => "15m",
            Interval::ThirtyMinutes => "30m",
            Interval::OneHour => "1h",
            Interval::TwoHours => "2h",
            Interval::FourHours => "4h",
            Interval::SixHours => "6h",
            Interval::EightHours => "8h",
            Interval::TwelveHours => "12h",
            Interval::OneDay => "1d",
            Interval::ThreeDays => "3d",
            Interval::OneWeek => "1w",
            Interval::OneMonth => "1M",
        }
    }

    pub fn granularity(&self) -> Granularity {
        match self {
            Interval::OneMinute
            | Interval::ThreeMinutes
            | Interval::FiveMinutes
            | Interval::FifteenMinutes
            | Interval::ThirtyMinutes => Granularity::Minute,
            Interval::OneHour
            | Interval::TwoHours
            | Interval::FourHours
            | Interval::SixHours
            | Interval::EightHours
            | Interval::TwelveHours => Granularity::Hour,
            Interval::OneDay | Interval::ThreeDays | Interval::OneWeek | Interval::OneMonth => {
                Granularity::Day
            }
        }
    }
}

impl FromStr for Interval {
    type Err = AppError;

    // Case-sensitive: `1m` is one minute, `1M` is one month.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Interval::ALL
            .iter()
            .copied()
            .find(|interval| interval.as_str() == s)
            .ok_or_else(|| AppError::ValidationError(format!("Invalid interval '{}'", s)))
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One OHLCV candle as received from the exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Error payload returned by Binance alongside non-2xx statuses.
#[derive(Debug, Serialize, Deserialize)]
pub struct BinanceErrorBody {
    pub code: i64,
    pub msg: String,
}

/// Parses one kline row: `[openTime, open, high, low, close, volume, ...]`.
///
/// Binance sends prices as strings; plain JSON numbers are accepted as well.
pub fn parse_kline_row(row: &[Value]) -> Result<PricePoint, AppError> {
    if row.len() < 6 {
        return Err(AppError::DataError(format!(
            "Kline row has {} fields, expected at least 6",
            row.len()
        )));
    }

    let open_time = row[0]
        .as_i64()
        .ok_or_else(|| AppError::DataError(format!("Invalid kline open time: {}", row[0])))?;
    let timestamp = Utc
        .timestamp_millis_opt(open_time)
        .single()
        .ok_or_else(|| AppError::DataError(format!("Kline open time out of range: {}", open_time)))?;

    Ok(PricePoint {
        timestamp,
        open: number_field(&row[1])?,
        high: number_field(&row[2])?,
        low: number_field(&row[3])?,
        close: number_field(&row[4])?,
        volume: number_field(&row[5])?,
    })
}

fn number_field(value: &Value) -> Result<f64, AppError> {
    match value {
        Value::String(s) => Ok(s.parse::<f64>()?),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| AppError::DataError(format!("Invalid number: {}", n))),
        other => Err(AppError::DataError(format!("Expected a number, got {}", other))),
    }
}
