pub mod catalog;
pub mod codes;
pub mod core;
pub mod setup;
pub mod students;
