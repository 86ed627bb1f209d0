//! Output rendering
//!
//! The final report table plus machine-readable snapshots.

mod formatter;
mod snapshot;

pub use formatter::ReportFormatter;
pub use snapshot::{snapshot_rows, write_snapshot, SnapshotFormat, SnapshotRow};
