// Ambient support: configuration, loop counters, shutdown token.

pub mod config;
pub mod metrics;
pub mod shutdown;
