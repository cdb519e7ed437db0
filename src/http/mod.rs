//! HTTP server startup and graceful shutdown.
//!
//! The server runs plain HTTP; TLS is expected to terminate at the load
//! balancer in front of it, which reports the original scheme through
//! `X-Forwarded-Proto`.

mod server;
mod shutdown;

pub use server::{start_server, ServerError};
