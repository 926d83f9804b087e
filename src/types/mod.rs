// src/types/mod.rs
pub mod job_role;

pub use job_role::*;
