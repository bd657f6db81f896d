//! Shared utilities for docform integration tests.

pub mod builders;
pub mod harness;

pub use builders::{DocxBuilder, PdfBuilder};
pub use harness::{read_part, TestHarness};
