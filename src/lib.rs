//! Personal cigarette counter. Keeps one count per day, derives cost and savings figures from it,
//! and mirrors today's count into a widget that can be written outside the application.
//!

pub mod cli;
pub mod error;
pub mod fs;
pub mod stats;
pub mod storage;
pub mod sync;
pub mod tracker;
pub mod ui;
pub mod utils;
