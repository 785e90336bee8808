//! Domain entities representing core business objects.

pub mod principal;
pub mod token;
pub mod user;

// Re-export commonly used types
pub use principal::{Principal, PrincipalType};
pub use token::{
    Claims, RefreshTokenRecord, RefreshTokenState, TokenPair, TokenType, UserContext,
};
pub use user::User;
