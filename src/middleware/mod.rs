pub mod auth;
pub mod response;
pub mod roles;

pub use auth::authenticate;
pub use response::{ApiResponse, ApiResult};
pub use roles::enforce_roles;
