//! Users, roles and the credential primitives the access gate relies on.

mod password;
mod token;
mod user;

pub use password::PasswordHasher;
pub use token::{Claims, TokenError, TokenSigner};
pub use user::{Role, User, UserProfile};

/// Minimum length for any password set through signup, change or reset.
pub const MIN_PASSWORD_LEN: usize = 8;
