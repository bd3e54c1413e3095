//! Run output.
//!
//! - [`report`]: per-run counters, the text summary and the JSON report file

pub mod report;
