// src/handlers/mod.rs

pub mod base;
pub mod proxy_loop;
pub mod rate_limit;

pub use base::{Action, RetryPolicy, UpstreamFailure};
pub use rate_limit::QuotaExhaustionPolicy;
