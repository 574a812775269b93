//! HTTP middleware.

pub mod csrf;
pub mod injection_scan;
pub mod request_id;
pub mod security_headers;

pub use csrf::{csrf_middleware, generate_csrf_token, issue_csrf_token, CsrfProtect};
pub use injection_scan::{injection_scan_middleware, scan_text, RiskLevel, ScanReport};
pub use request_id::{request_id_middleware, RequestId};
pub use security_headers::security_headers_middleware;
