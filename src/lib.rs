//! Data Master test bench
//!
//! A declarative test harness for the data master scheduler tools. Test
//! cases are ordered lists of operations replayed against a live DUT
//! through its command-line tools, with responses checked against golden
//! files or expected rejection messages.

pub mod cli;
pub mod commands;
pub mod common;
pub mod dut;
pub mod testing;

// Re-export commonly used types for tests
pub use common::{Error, Result};
pub use dut::{DataMaster, Domain, Outcome, Transport};
pub use testing::{Engine, TestCase};
