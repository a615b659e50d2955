pub mod aggregate;
pub mod compiler;
pub mod config;
pub mod crosswalk;
pub mod error;
pub mod feedback;
pub mod fragment;
pub mod git;
pub mod grading_sheet;
pub mod io;
pub mod paths;
pub mod platform;
pub mod progress;
pub mod remote;
pub mod repository;
pub mod runner;
pub mod scanner;
pub mod similarity;
pub mod sync;

pub use error::{GradeError, Result};
