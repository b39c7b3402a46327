//! Moving-average indicators over closing prices.
//!
//! [`IndicatorEngine`] computes one [`IndicatorSeries`] entry per requested
//! window. The arithmetic is delegated to an [`SmaStrategy`]; the strategy is
//! picked once at startup from an [`SmaKernel`], either pinned through
//! configuration or probed from the host CPU.

pub mod moving_average;

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use indexmap::IndexMap;
use tracing::debug;

pub use moving_average::{RollingSma, WindowedSma};

/// Fractional digits kept in every emitted SMA value.
pub const SMA_PRECISION: i32 = 6;

/// Simple moving average over a slice of closes.
///
/// Implementations return exactly `closes.len()` entries: `None` while fewer
/// than `window` closes are available, the unrounded trailing mean after that.
pub trait SmaStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn sma(&self, closes: &[f64], window: usize) -> Vec<Option<f64>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SmaKernel {
    #[default]
    Auto,
    Windowed,
    Rolling,
}

impl SmaKernel {
    /// Resolves `Auto` to a concrete kernel for this host.
    pub fn resolve(self) -> SmaKernel {
        match self {
            SmaKernel::Auto => detect_best_kernel(),
            other => other,
        }
    }

    pub fn strategy(self) -> Box<dyn SmaStrategy> {
        match self.resolve() {
            SmaKernel::Rolling => Box::new(RollingSma::new()),
            _ => Box::new(WindowedSma::new()),
        }
    }
}

impl FromStr for SmaKernel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(SmaKernel::Auto),
            "windowed" | "scalar" => Ok(SmaKernel::Windowed),
            "rolling" => Ok(SmaKernel::Rolling),
            other => Err(format!("unknown SMA kernel: {}", other)),
        }
    }
}

impl fmt::Display for SmaKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SmaKernel::Auto => "auto",
            SmaKernel::Windowed => "windowed",
            SmaKernel::Rolling => "rolling",
        };
        f.write_str(name)
    }
}

/// The rolling kernel is preferred on hosts with wide vector units, where the
/// running-sum loop is the faster of the two.
pub fn detect_best_kernel() -> SmaKernel {
    static BEST: OnceLock<SmaKernel> = OnceLock::new();
    *BEST.get_or_init(|| {
        #[cfg(target_arch = "x86_64")]
        {
            if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
                return SmaKernel::Rolling;
            }
        }
        SmaKernel::Windowed
    })
}

/// SMA values keyed by window size, in the order the windows were requested.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    series: IndexMap<usize, Vec<Option<f64>>>,
}

impl IndicatorSeries {
    pub fn windows(&self) -> impl Iterator<Item = usize> + '_ {
        self.series.keys().copied()
    }

    pub fn get(&self, window: usize) -> Option<&[Option<f64>]> {
        self.series.get(&window).map(Vec::as_slice)
    }

    /// Value of `window` at `index`; `None` when undefined or out of range.
    pub fn value_at(&self, window: usize, index: usize) -> Option<f64> {
        self.series.get(&window).and_then(|s| s.get(index).copied().flatten())
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

pub struct IndicatorEngine {
    strategy: Box<dyn SmaStrategy>,
}

impl IndicatorEngine {
    pub fn new(strategy: Box<dyn SmaStrategy>) -> Self {
        Self { strategy }
    }

    pub fn from_kernel(kernel: SmaKernel) -> Self {
        let engine = Self::new(kernel.strategy());
        debug!("Using {} SMA kernel", engine.strategy_name());
        engine
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Computes every requested window over the same closes. Duplicate
    /// windows collapse into one series.
    pub fn compute(&self, closes: &[f64], windows: &[usize]) -> IndicatorSeries {
        let mut series: IndexMap<usize, Vec<Option<f64>>> = IndexMap::with_capacity(windows.len());
        for &window in windows {
            if series.contains_key(&window) {
                continue;
            }
            let values: Vec<Option<f64>> = self
                .strategy
                .sma(closes, window)
                .into_iter()
                .map(|v| v.map(|x| round_to(x, SMA_PRECISION)))
                .collect();
            series.insert(window, values);
        }
        IndicatorSeries { series }
    }
}

pub fn round_to(value: f64, digits: i32) -> f64 {
    let scale = 10f64.powi(digits);
    (value * scale).round() / scale
}
