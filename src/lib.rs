pub mod config;
pub mod cricapi;
pub mod error;
pub mod feed;
pub mod http_client;
pub mod persist;
pub mod reconcile;
pub mod resolve;
pub mod score;
pub mod state;
pub mod status;
