// File I/O operations

pub mod export;
pub mod extract;
pub mod store;
pub mod walk;
