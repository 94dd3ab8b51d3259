//! Results-file ingest and metric-table export.

pub mod export;
pub mod ingest;
