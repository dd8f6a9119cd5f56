//! scenegen API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! streaming gateway, background tasks) so integration tests and the binary
//! entrypoint can both access them.

pub mod background;
pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod routes;
pub mod state;
pub mod status;
pub mod stream;
pub mod ws;
