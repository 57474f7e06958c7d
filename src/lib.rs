pub(crate) mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod observability;
pub mod reasoning;
pub mod render;
pub mod routing;
pub mod session;
pub mod state;
pub mod stream;
pub mod typing;
