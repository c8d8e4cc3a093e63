//! HTTP transport for the extraction runner.

pub mod auth;
pub mod error;
pub mod export;
pub mod middleware;
pub mod routes;
pub mod status;

pub use routes::*;
