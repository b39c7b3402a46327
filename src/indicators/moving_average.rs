use super::SmaStrategy;

/// Re-sums every window from scratch. Slow for large windows but carries no
/// accumulated floating error between positions.
pub struct WindowedSma;

impl WindowedSma {
    pub fn new() -> Self {
        Self
    }
}

impl SmaStrategy for WindowedSma {
    fn name(&self) -> &'static str {
        "windowed"
    }

    fn sma(&self, closes: &[f64], window: usize) -> Vec<Option<f64>> {
        let mut result = vec![None; closes.len()];
        if window == 0 || closes.len() < window {
            return result;
        }

        for i in window - 1..closes.len() {
            let sum: f64 = closes[i + 1 - window..=i].iter().sum();
            result[i] = Some(sum / window as f64);
        }

        result
    }
}

/// Single pass with a running sum: add the entering close, drop the leaving one.
pub struct RollingSma;

impl RollingSma {
    pub fn new() -> Self {
        Self
    }
}

impl SmaStrategy for RollingSma {
    fn name(&self) -> &'static str {
        "rolling"
    }

    fn sma(&self, closes: &[f64], window: usize) -> Vec<Option<f64>> {
        let mut result = vec![None; closes.len()];
        if window == 0 || closes.len() < window {
            return result;
        }

        let divisor = window as f64;
        let mut sum: f64 = closes[..window].iter().sum();
        result[window - 1] = Some(sum / divisor);

        for i in window..closes.len() {
            sum += closes[i] - closes[i - window];
            result[i] = Some(sum / divisor);
        }

        result
    }
}
