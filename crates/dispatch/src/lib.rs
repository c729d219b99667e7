//! Bulk dispatch: render one message per recipient, send it, and report.
//!
//! A batch is best effort. Render and send failures are recorded against the
//! recipient and the batch carries on; only input validation and source
//! resolution (both handled before a batch starts) abort a request.

pub mod engine;
pub mod pairing;
pub mod report;

pub use engine::{DispatchEngine, DispatchSettings};
pub use pairing::{paired_contexts, paired_messages};
pub use report::{summarize, BatchKind, BatchReport, FailureDetail};
