//! Data Transfer Objects for REST request/response serialization.

pub mod repository_dto;
pub mod room_dto;

pub use repository_dto::*;
pub use room_dto::*;
