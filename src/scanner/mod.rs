//! Scan orchestration
//!
//! A scan turns a batch of [`ScanTask`]s into a [`ScanResult`](crate::types::ScanResult).
//! Each task runs as its own tokio task; a semaphore bounds how many registry queries are
//! in flight, and each query carries its own timeout.
//!
//! ```text
//! Queued ──▶ Dispatched ──▶ Fetching ──┬──▶ Classified (Update | UpToDate)
//!  (slot)      (query)      (timeout)  └──▶ Failed
//! ```

pub mod service;
pub mod task;

pub use service::{Scanner, evaluate_tags};
pub use task::{ScanTask, TaskState};
