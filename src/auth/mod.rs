//! Authentication module

pub mod jwt;
pub mod middleware;
pub mod password;

pub use jwt::{Claims, JwtService};
pub use middleware::{extract_token, optional_auth_middleware, AuthContext};
pub use password::PasswordHasher;
