//! Data models for the TaskLens application.
//!
//! These models match the frontend TypeScript interfaces exactly for seamless interoperability.

mod datastore;
mod extraction;
mod member;
mod task;

pub use datastore::*;
pub use extraction::*;
pub use member::*;
pub use task::*;
