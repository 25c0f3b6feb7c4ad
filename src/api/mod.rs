pub mod middleware;
pub mod rate_limit;
pub mod rest;

pub use rate_limit::RateLimiter;
pub use rest::{ApiState, create_router};
