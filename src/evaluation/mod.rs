pub mod kmeans;
pub mod metrics;
