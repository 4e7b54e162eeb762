//! # devhub-gateway
//!
//! Backend core of a multi-tenant development platform:
//!
//! - a **transaction coordinator** that runs multi-step workflows spanning
//!   a local PostgreSQL store and a remote Git gateway, compensating the
//!   completed steps in reverse order when a later step fails;
//! - a **collaboration hub** that fans typed events out to every WebSocket
//!   session of a project room, with bounded per-session queues and
//!   slow-consumer eviction.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers (api/) ────────┐
//!     ├── WS Handler (ws/)             │
//!     │       │                        │
//!     │   Hub event loop (hub/)    RepositoryService (service/)
//!     │       │                        │
//!     │   RoomDirectory            Coordinator (txn/)
//!     │                                │
//!     │                  ┌─────────────┴─────────────┐
//!     │            LocalStore (persistence/)    GitGateway (adapters/)
//!     │                  │                           │
//!     └──────────── PostgreSQL                 Git gateway REST API
//! ```

pub mod adapters;
pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod hub;
pub mod persistence;
pub mod service;
pub mod txn;
pub mod ws;
