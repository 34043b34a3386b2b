//! Core domain entities
//!
//! All feed entities are defined here. These are pure data structures
//! with validation logic - no I/O or external dependencies.

mod category;
mod post;
mod user;
pub mod result;

pub use category::Category;
pub use post::{AuthoredComment, Comment, Post};
pub use user::{User, DEFAULT_AVATAR};

pub(crate) use user::random_base36;
