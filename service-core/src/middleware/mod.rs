pub mod cors;
pub mod rate_limit;
pub mod security_headers;
pub mod tracing;

pub use self::cors::{cors_layer, AllowedOrigins};
pub use rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware};
pub use security_headers::security_headers_middleware;
pub use self::tracing::{request_id_middleware, REQUEST_ID_HEADER};
