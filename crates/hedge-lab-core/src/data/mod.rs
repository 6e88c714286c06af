pub mod alignment;
pub mod loader;
pub mod series;
pub mod source;

pub use alignment::{align, summarize, AlignedSeries, DataSummary, PricePoint};
pub use series::{MissingValuePolicy, PriceSeries, RawPriceSeries};
