//! Cost optimizer service: HTTP API, configuration and component wiring

pub mod api;
pub mod app;
pub mod config;
