pub mod core;
pub mod gradebook;
pub mod grades;
pub mod students;
