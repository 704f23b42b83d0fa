//! Password hashing, JWT issuance and the request extractors that gate
//! authenticated routes.

pub mod extractor;
pub mod jwt;
pub mod password;

pub use extractor::{AdminUser, AuthUser};
pub use jwt::{Claims, JwtManager};
