pub mod processor;
pub mod types;
pub mod utils;

pub use processor::{FileFormat, TableProcessor};
pub use types::{Cell, CellKey, Column, Table};
