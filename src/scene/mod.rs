/// Project files.
pub mod project;
