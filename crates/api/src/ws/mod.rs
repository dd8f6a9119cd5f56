//! WebSocket transport for job events.

mod handler;

pub use handler::job_ws_handler;
