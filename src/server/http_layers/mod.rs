mod client_ip;
mod requests_logging;

pub use client_ip::ClientIp;
pub use requests_logging::{log_requests, RequestsLoggingLevel};
