//! Domain models shared across blogd components.

mod attachment;
mod post;
mod user;

pub use attachment::{AttachmentClass, NewAttachment, StoredAttachment};
pub use post::{Post, PostResponse};
pub use user::{User, UserResponse};

pub use crate::config::ClassRules;
