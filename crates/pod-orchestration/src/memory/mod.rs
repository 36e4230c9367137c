//! In-memory orchestration service and definition cache
//!
//! Constructed explicitly and shared through an `Arc`; nothing here is
//! process-global. Intended for tests and local development.

mod cache;
mod ecs;
mod secrets;

pub use cache::MemoryPodDefinitionCache;
pub use ecs::{EcsOperation, MemoryEcsClient};
