//! Boundary with the remote container orchestration service
//!
//! [`EcsClient`] is implemented by adapters over the real service; the types
//! in [`api`] mirror its request and response shapes. The functions in
//! [`translate`] map this crate's options onto those shapes and back.

pub mod api;
mod client;
mod failure;
pub mod translate;

pub use client::{EcsClient, EcsResult};
pub use failure::{convert_failure, convert_failures, is_insufficient_capacity};
