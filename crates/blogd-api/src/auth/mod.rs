//! Authentication: password hashing, session storage, and handlers.

pub mod handlers;
pub mod middleware;
pub mod password;
pub mod session;

pub use middleware::CurrentUser;
