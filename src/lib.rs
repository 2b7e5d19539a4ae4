pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod observability;
pub mod rpc;
pub mod utils;
