//! Greeter web app: combines the greeting and name services into one message.
//!
//! Exposes `GET /health` and `GET /`, which fans out to the greeting and name
//! upstreams, reports the pair to a tracking endpoint, and returns
//! `"<greeting> <name>"`.

pub mod aggregate;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod upstream;

pub use error::AppError;
pub use routes::create_router;
pub use state::AppState;
