pub mod assembler;
pub mod classifier;
pub mod normalizer;
pub mod reader;
pub mod statistics;
pub mod types;
pub mod utils;

#[cfg(test)]
pub mod fixtures;

pub use assembler::SheetAssembler;
pub use reader::WorkbookReader;
pub use types::{SheetErrorPolicy, SheetSource};
