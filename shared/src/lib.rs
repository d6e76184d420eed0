//! Re-exports the pieces shared by the coaching API service and its clients:
//! settings handling, the wire DTOs, the common error type and the typed HTTP
//! client for the REST endpoints.

pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod utils;
