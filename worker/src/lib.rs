pub mod enumerator;
pub mod lines;
pub mod marker;
pub mod processor;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use enumerator::{fetch_lines, Enumeration, WorkEnumerator};
pub use lines::{default_input_bucket, line_digest, run_line_job, LineSummary};
pub use marker::{CompletionMarker, MarkOutcome};
pub use processor::{ItemProcessor, ProcessOutcome};
pub use worker::{InvoiceWorker, RunSummary};
