pub mod catalog;
pub mod error;
pub mod evaluator;
pub mod lifecycle;
pub mod store;
pub mod work_hours;
