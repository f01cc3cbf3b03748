// src/io/mod.rs
//! Tabular plumbing around the core: read review rows, write scored rows.
//! The core never touches the filesystem; only these functions do.

pub mod reader;
pub mod writer;

pub use reader::{read_records, read_records_csv, read_records_json, ReaderOptions};
pub use writer::{write_csv, write_json, write_output, OUTPUT_HEADERS};
