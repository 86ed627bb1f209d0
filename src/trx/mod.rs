//! TRX report handling
//!
//! The external tool writes a TRX (Visual Studio Test Results) file each
//! run; this module turns it into per-test outcomes.

mod parser;

pub use parser::{parse_report, parse_trx};
