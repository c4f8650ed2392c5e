//! Market metrics: supply breakdown, holder distribution, volume, liquidity

pub mod analyzer;
pub mod classification;
pub mod distribution;

pub use analyzer::{activity_metrics, MarketMetricsAnalyzer};
pub use classification::ClassificationRules;
pub use distribution::{distribution_metrics, gini_coefficient, top_k_concentration};
