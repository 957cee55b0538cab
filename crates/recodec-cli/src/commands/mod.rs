//! CLI command implementations.

pub mod common;
pub mod compare;
pub mod export;
pub mod rescore;
pub mod resume;
pub mod run;
pub mod status;
