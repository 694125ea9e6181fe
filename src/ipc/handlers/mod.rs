pub mod backup_exchange;
pub mod classes;
pub mod core;
pub mod notes;
pub mod notifications;
pub mod records;
pub mod schedule;
pub mod students;
