pub mod password;
pub mod token;

pub use password::{PasswordConfig, PasswordError, PasswordHasher};
pub use token::{Claims, TokenError, TokenService};
