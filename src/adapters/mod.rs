//! Collaborator contracts used by the transaction steps, with their
//! HTTP, PostgreSQL and in-memory implementations.

pub mod git_gateway;
pub mod http_gateway;
pub mod local_store;
pub mod memory;

pub use git_gateway::{
    CreateRemoteRepository, GitGateway, RemoteBranch, RemoteRepository, RemoteRepositoryPatch,
};
pub use http_gateway::HttpGitGateway;
pub use local_store::{LocalStore, LocalTx, within_local_transaction};
pub use memory::{GatewayCall, GatewayOp, MemoryGitGateway, MemoryStore, StoreOp};
