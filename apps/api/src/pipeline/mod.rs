//! Candidate pipelines: intake of uploaded resumes and re-evaluation of a job's
//! candidates after its description changes.
//!
//! Ingestion is lenient (scoring trouble never loses an upload); re-evaluation
//! is fail-fast.

pub mod ingest;
pub mod reevaluate;

pub use ingest::{ingest_batch, ingest_document, BatchUploadReport, UploadedFile};
pub use reevaluate::{update_job, JobUpdateOutcome};
