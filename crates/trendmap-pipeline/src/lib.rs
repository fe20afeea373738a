//! Snapshot ingestion and staleness-aware retrieval.
//!
//! [`Ingestor`] runs one ingestion cycle: fetch every configured region,
//! rank, append, prune. [`Retriever`] answers time-range queries against the
//! stored snapshots, skipping entries that are still being enriched.

pub mod error;
pub mod ingest;
pub mod retrieve;

pub use error::IngestError;
pub use ingest::{CycleReport, IngestConfig, Ingestor};
pub use retrieve::{
    select_entry, Retrieved, Retriever, PIPELINE_LAG_MINUTES, RECENT_QUERY_LIMIT,
    SNAPSHOT_PERIOD_HOURS,
};
