use thiserror::Error;
use trendmap_db::StoreError;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The cycle's snapshot could not be persisted. Nothing was written.
    #[error("failed to append snapshot: {0}")]
    Append(#[source] StoreError),
}
