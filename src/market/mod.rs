pub mod model;
pub mod service;

pub use model::{Granularity, Interval, PricePoint};
pub use service::{BinanceClient, CandleSource};
