//! Data models
//!
//! Database entities (User, BlogPost), the session claims carried in the
//! cookie, and the input types used to create entities.

mod post;
mod session;
mod user;

pub use post::{
    BlogPost, CategorizedPosts, Category, CategoryBucket, CreatePostInput, UnknownCategory,
};
pub use session::SessionClaims;
pub use user::{Address, CreateUserInput, User, UserRole};
