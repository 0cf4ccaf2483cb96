//! Tabular input and output.

pub mod csv;

pub use self::csv::{load_csv, read_csv, write_csv, CsvLayout};
