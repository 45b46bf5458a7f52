pub mod auth;
pub mod config;
pub mod error;
pub mod forward;
pub mod logging;
pub mod middleware;
pub mod pipeline;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod stream;
pub mod tools;
