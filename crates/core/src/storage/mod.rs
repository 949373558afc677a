mod batching;
mod error;
mod traits;
mod types;

pub use batching::{is_single_partition, partition_batches};
pub use error::{QueryError, Result, StoreError};
pub use traits::TableStore;
pub use types::{
    BatchOperation, ContinuationToken, KeyFilter, Page, RecordPage, StoreRecord,
    DEFAULT_PAGE_SIZE, MAX_BATCH_SIZE,
};
