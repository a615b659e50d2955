pub mod access;
pub mod aggregate;
pub mod clone;
pub mod compile_check;
pub mod feedback;
pub mod list;
pub mod lookup;
pub mod moss;
pub mod push;
pub mod run_local;
pub mod track;
pub mod update;
pub mod workflow;
