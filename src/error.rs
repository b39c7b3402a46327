use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
  #[error("Config error: {0}")]
  ConfigError(String),

  #[error("Validation error: {0}")]
  ValidationError(String),

  #[error("Binance API error (code {code}): {message}")]
  ExchangeError { code: i64, message: String },

  #[error("Binance request error: {0}")]
  RequestError(String),

  #[error("Malformed market data: {0}")]
  DataError(String),

  #[error("Internal error: {0}")]
  InternalError(String),
}

impl From<reqwest::Error> for AppError {
  fn from(err: reqwest::Error) -> Self {
      if err.is_decode() {
          Self::DataError(err.to_string())
      } else {
          Self::RequestError(err.to_string())
      }
  }
}

impl From<serde_json::Error> for AppError {
  fn from(err: serde_json::Error) -> Self {
      Self::InternalError(format!("JSON serialization error: {}", err))
  }
}

impl From<std::num::ParseFloatError> for AppError {
  fn from(err: std::num::ParseFloatError) -> Self {
      Self::DataError(format!("Invalid number: {}", err))
  }
}
