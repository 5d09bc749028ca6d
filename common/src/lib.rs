pub mod api;
pub mod error;
pub mod extract;
pub mod item;
pub mod job;
pub mod logging;
pub mod partition;
pub mod results;
pub mod store;
pub mod task;

pub use api::{ApproveRequest, ApproveResponse, PendingInvoice, UploadResponse};
pub use error::{ConfigError, ExtractError, ProcessError, StoreError};
pub use extract::{DocumentAiClient, DocumentExtractor, ExtractedDocument, ProcessorTarget};
pub use item::{LineItem, Location, WorkItem};
pub use job::{ExtractionConfig, Prefixes, StorageConfig};
pub use partition::{Assignment, KeySpace, Ownership, PrefixPartition, RangePartition, HEX_ALPHABET};
pub use results::{
    InvoiceRecord, JsonResultStore, MemoryResultStore, ResultStore, ReviewState,
    INVOICES_COLLECTION,
};
pub use store::{FsObjectStore, MemoryObjectStore, ObjectEntry, ObjectStore};
pub use task::TaskDescriptor;
