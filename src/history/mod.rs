//! Kline history with optional moving averages.
//!
//! When averages are requested the fetch starts `max_window + PADDING_DAYS`
//! days before the requested start, so the first requested candle already has
//! a full window behind it. The warm-up candles are dropped again before the
//! records are returned.

pub mod format;
pub mod range;

use tracing::info;

use crate::error::AppError;
use crate::indicators::{IndicatorEngine, IndicatorSeries};
use crate::market::{CandleSource, Interval};

pub use format::{EnrichedRecord, RecordLayout};
pub use range::DateRange;

#[derive(Debug, Clone)]
pub struct HistoryRequest {
    pub symbol: String,
    pub interval: Interval,
    pub range: DateRange,
    /// Moving-average windows; empty disables the averages and the extension.
    pub windows: Vec<usize>,
    pub layout: RecordLayout,
}

pub struct HistoryService {
    source: Box<dyn CandleSource>,
    engine: IndicatorEngine,
}

impl HistoryService {
    pub fn new(source: Box<dyn CandleSource>, engine: IndicatorEngine) -> Self {
        Self { source, engine }
    }

    /// Fetches, annotates and trims the candles for `request`. An empty vector
    /// means the exchange had no candles in the range.
    pub async fn fetch_history(&self, request: &HistoryRequest) -> Result<Vec<EnrichedRecord>, AppError> {
        let max_window = request.windows.iter().max().copied();
        let extended = max_window.is_some();
        let fetch_start = range::extend(&request.range, max_window);

        if extended {
            info!(
                "Fetching extended data from {} to {} for MA calculation...",
                fetch_start,
                request.range.end()
            );
        }
        info!(
            "Fetching {} K-line data with {} interval from {} to {}...",
            request.symbol,
            request.interval,
            fetch_start,
            request.range.end()
        );

        let (start, end) = range::fetch_bounds(fetch_start, request.range.end());
        let points = self
            .source
            .fetch_candles(&request.symbol, request.interval, start, end)
            .await?;

        if points.is_empty() {
            return Ok(Vec::new());
        }

        let indicators = if extended {
            info!("Calculating moving averages...");
            let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
            self.engine.compute(&closes, &request.windows)
        } else {
            IndicatorSeries::default()
        };

        let records = points
            .iter()
            .enumerate()
            .map(|(index, point)| format::merge(point, &indicators, index, &request.layout))
            .collect();

        Ok(range::filter(records, request.range.start(), extended))
    }
}
