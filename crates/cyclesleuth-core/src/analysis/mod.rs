//! Analysis: percentiles and per-workstation restore-time statistics.
pub mod percentiles;
pub mod statistics;

pub use percentiles::percentile;
pub use statistics::{
    closest_index, find_outliers, indices_equal_to, Outlier, StatisticsSummary, FENCE_FACTOR,
};
