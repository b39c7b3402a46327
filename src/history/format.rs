use chrono::{DateTime, NaiveDate, Utc};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use crate::error::AppError;
use crate::indicators::IndicatorSeries;
use crate::market::{Granularity, Interval, PricePoint};

/// How a candle's open time is rendered in the `datetime` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayFormat {
    Date,
    DateHour,
    DateTime,
}

impl DisplayFormat {
    pub fn for_interval(interval: Interval) -> Self {
        match interval.granularity() {
            Granularity::Day => DisplayFormat::Date,
            Granularity::Hour => DisplayFormat::DateHour,
            Granularity::Minute => DisplayFormat::DateTime,
        }
    }

    pub fn pattern(&self) -> &'static str {
        match self {
            DisplayFormat::Date => "%Y-%m-%d",
            DisplayFormat::DateHour => "%Y-%m-%d %H:%M",
            DisplayFormat::DateTime => "%Y-%m-%d %H:%M:%S",
        }
    }

    /// Renders in UTC, so the shown date is the one the range filter compares.
    pub fn render(&self, timestamp: &DateTime<Utc>) -> String {
        timestamp.format(self.pattern()).to_string()
    }
}

/// Shape of the emitted records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordLayout {
    pub display: DisplayFormat,
    pub include_volume: bool,
}

impl RecordLayout {
    pub fn for_interval(interval: Interval) -> Self {
        Self {
            display: DisplayFormat::for_interval(interval),
            include_volume: true,
        }
    }

    /// Full timestamps and no volume, whatever the interval.
    pub fn plain() -> Self {
        Self {
            display: DisplayFormat::DateTime,
            include_volume: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichedRecord {
    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
    pub datetime: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
    pub change: String,
    pub percentage_change: String,
    #[serde(flatten)]
    pub moving_averages: IndexMap<String, Option<f64>>,
}

impl EnrichedRecord {
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}

pub fn ma_field_name(window: usize) -> String {
    format!("ma{}", window)
}

/// `change` with 4 decimals and `percentage_change` with 2 decimals and a
/// percent sign. A zero open yields a zero percentage.
pub fn format_change(open: f64, close: f64) -> (String, String) {
    let change = close - open;
    let percentage = if open != 0.0 { change / open * 100.0 } else { 0.0 };
    (format!("{:.4}", change), format!("{:.2}%", percentage))
}

/// Builds the output record for `raw`, the candle at `index` of the series
/// the indicators were computed over. Every window in `indicators` gets a
/// field, `null` where the average is undefined.
pub fn merge(raw: &PricePoint, indicators: &IndicatorSeries, index: usize, layout: &RecordLayout) -> EnrichedRecord {
    let (change, percentage_change) = format_change(raw.open, raw.close);

    let moving_averages = indicators
        .windows()
        .map(|window| (ma_field_name(window), indicators.value_at(window, index)))
        .collect();

    EnrichedRecord {
        timestamp: raw.timestamp,
        datetime: layout.display.render(&raw.timestamp),
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: layout.include_volume.then_some(raw.volume),
        change,
        percentage_change,
        moving_averages,
    }
}

/// JSON array with a four-space indent.
pub fn to_pretty_json(records: &[EnrichedRecord]) -> Result<String, AppError> {
    let mut buf = Vec::new();
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut buf, formatter);
    records.serialize(&mut serializer)?;
    String::from_utf8(buf).map_err(|e| AppError::InternalError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::indicators::{IndicatorEngine, SmaKernel};

    fn point(h: u32, min: u32, open: f64, close: f64) -> PricePoint {
        PricePoint {
            timestamp: Utc.with_ymd_and_hms(2024, 1, 10, h, min, 5).unwrap(),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 12.5,
        }
    }

    #[test]
    fn test_percentage_change() {
        assert_eq!(format_change(100.0, 105.0), ("5.0000".to_string(), "5.00%".to_string()));
        assert_eq!(format_change(0.0, 5.0), ("5.0000".to_string(), "0.00%".to_string()));
        assert_eq!(format_change(200.0, 150.0), ("-50.0000".to_string(), "-25.00%".to_string()));
    }

    #[test]
    fn test_display_formats() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 10, 23, 30, 15).unwrap();
        assert_eq!(DisplayFormat::for_interval(Interval::OneDay).render(&ts), "2024-01-10");
        assert_eq!(DisplayFormat::for_interval(Interval::OneWeek).render(&ts), "2024-01-10");
        assert_eq!(DisplayFormat::for_interval(Interval::OneHour).render(&ts), "2024-01-10 23:30");
        assert_eq!(
            DisplayFormat::for_interval(Interval::FiveMinutes).render(&ts),
            "2024-01-10 23:30:15"
        );
    }

    #[test]
    fn test_merge_with_indicators() {
        let raw = vec![point(0, 0, 10.0, 10.0), point(1, 0, 10.0, 20.0), point(2, 0, 20.0, 30.0)];
        let closes: Vec<f64> = raw.iter().map(|p| p.close).collect();
        let indicators = IndicatorEngine::from_kernel(SmaKernel::Windowed).compute(&closes, &[2, 7]);
        let layout = RecordLayout::for_interval(Interval::OneHour);

        let first = merge(&raw[0], &indicators, 0, &layout);
        assert_eq!(first.moving_averages.get("ma2"), Some(&None));
        assert_eq!(first.moving_averages.get("ma7"), Some(&None));

        let last = merge(&raw[2], &indicators, 2, &layout);
        assert_eq!(last.datetime, "2024-01-10 02:00");
        assert_eq!(last.volume, Some(12.5));
        assert_eq!(last.change, "10.0000");
        assert_eq!(last.percentage_change, "50.00%");
        assert_eq!(last.moving_averages.get("ma2"), Some(&Some(25.0)));
        assert_eq!(
            last.moving_averages.keys().collect::<Vec<_>>(),
            vec!["ma2", "ma7"]
        );
    }

    #[test]
    fn test_merge_without_indicators_has_no_ma_fields() {
        let record = merge(&point(0, 0, 1.0, 2.0), &IndicatorSeries::default(), 0, &RecordLayout::plain());
        assert!(record.moving_averages.is_empty());
        assert_eq!(record.volume, None);
        assert_eq!(record.datetime, "2024-01-10 00:00:05");
    }

    #[test]
    fn test_json_field_order_and_nulls() {
        let raw = point(0, 0, 100.0, 105.0);
        let indicators = IndicatorEngine::from_kernel(SmaKernel::Windowed).compute(&[105.0], &[7]);
        let record = merge(&raw, &indicators, 0, &RecordLayout::for_interval(Interval::OneDay));
        let json = to_pretty_json(&[record]).unwrap();

        let expected = r#"[
    {
        "datetime": "2024-01-10",
        "open": 100.0,
        "high": 106.0,
        "low": 99.0,
        "close": 105.0,
        "volume": 12.5,
        "change": "5.0000",
        "percentage_change": "5.00%",
        "ma7": null
    }
]"#;
        assert_eq!(json, expected);
    }

    #[test]
    fn test_plain_layout_omits_volume() {
        let record = merge(&point(0, 0, 1.0, 1.0), &IndicatorSeries::default(), 0, &RecordLayout::plain());
        let value: serde_json::Value = serde_json::from_str(&to_pretty_json(&[record]).unwrap()).unwrap();
        assert!(value[0].get("volume").is_none());
        assert_eq!(value[0]["percentage_change"], "0.00%");
    }

    #[test]
    fn test_empty_output() {
        assert_eq!(to_pretty_json(&[]).unwrap(), "[]");
    }
}
