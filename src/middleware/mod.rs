pub mod param_pollution;
pub mod rate_limit;
pub mod sanitize;
pub mod security;
pub mod stamp;
