pub mod api;
pub mod client;
pub mod config;
pub mod humanize;
pub mod limiter;
pub mod observability;
pub mod proxy;
pub mod resolver;
pub mod upstream; // Exposes MockFetcher for integration tests
