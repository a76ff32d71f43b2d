pub mod excel;
pub mod store;
