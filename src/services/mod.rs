//! Services layer - Business logic
//!
//! Services validate input, coordinate repositories with file storage, and
//! translate storage failures into typed errors for the web layer.

pub mod password;
pub mod post;
pub mod session;
pub mod upload;
pub mod user;

pub use password::{hash_password, verify_password};
pub use post::{categorize, PostDraft, PostService, PostServiceError};
pub use session::{SessionError, SessionManager};
pub use upload::{FileStore, UploadError, UploadedFile};
pub use user::{RegisterInput, UserService, UserServiceError};
