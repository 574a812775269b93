//! Blogd Database Library
//!
//! sqlx repositories over Postgres for users, posts, and attachments.

mod attachments;
mod posts;
mod users;

pub use attachments::AttachmentRepository;
pub use posts::PostRepository;
pub use users::UserRepository;
