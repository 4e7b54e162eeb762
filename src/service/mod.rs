//! Service layer: business logic orchestration.
//!
//! [`RepositoryService`] expresses every repository write as a coordinated
//! transaction over the local store and the Git gateway.

pub mod repository_service;

pub use repository_service::{BranchCreated, CreateBranch, CreateRepository, RepositoryService};
