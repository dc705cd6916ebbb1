pub mod file_storage;
pub mod schedule_cache;
