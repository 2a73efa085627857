//! A reverse, multi-segment scanner over a write-ahead log's tail: it
//! decides whether crash recovery must run, where it should resume from,
//! and what the first not-yet-checkpointed transaction is.
//!
//! Writing log entries, repairing corrupt logs, and checkpoint scheduling
//! policy are out of scope — this crate only reads and reports.

pub mod config;
pub mod entry_reader;
pub mod error;
pub mod file_set;
pub mod format;
pub mod io;
pub mod monitor;
pub mod position;
pub mod scanner;

pub use config::ScannerConfig;
pub use error::{Result, ScanError};
pub use file_set::LogFileSet;
pub use format::{CorruptReason, LogEntry};
pub use monitor::{NoopMonitor, ScanMonitor, TracingMonitor};
pub use position::LogPosition;
pub use scanner::{CheckPoint, StoreId, TailInformation, TailScanner, NO_TRANSACTION_ID};
