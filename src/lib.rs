pub mod config;
pub mod error;
pub mod http;
pub mod limiter;
pub mod security;
pub mod document;
pub mod transport;
pub mod invoker;
pub mod client;
pub mod analytics;
pub mod utils;

pub use client::CrptApi;
pub use config::{Config, ErrorPolicy, LimiterConfig, LogFormat, TimeUnit};
pub use error::{AppError, Result};
pub use invoker::RateLimitedInvoker;
pub use limiter::{Permit, PermitPool, RateLimiter, ReplenishScheduler};
