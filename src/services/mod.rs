pub mod eda;
pub mod file_processor;
pub mod store;
pub mod table;
