pub mod aggregate;
pub mod api;
pub mod backoff;
pub mod classify;
pub mod config;
pub mod demo_feed;
pub mod error;
pub mod feed;
pub mod http_client;
pub mod push;
pub mod reconcile;
pub mod standings;
pub mod state;
