//! Business logic services

pub mod records;

pub use records::RecordService;
