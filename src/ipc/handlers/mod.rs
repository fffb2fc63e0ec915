pub mod admissions;
pub mod core;
pub mod ids;
