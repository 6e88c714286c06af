pub mod data;
pub mod error;
pub mod export;
pub mod hedge_ratio;
pub mod stats;
pub mod types;

#[cfg(feature = "backtest")]
pub mod backtest;

#[cfg(feature = "stress")]
pub mod stress;

#[cfg(feature = "stress")]
pub mod config;

#[cfg(feature = "stress")]
pub mod session;

#[cfg(feature = "reporting")]
pub mod report;

pub use error::HedgeError;
pub use types::*;

/// Standard result type for all hedge-lab operations
pub type HedgeResult<T> = Result<T, HedgeError>;
