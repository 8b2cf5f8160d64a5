pub mod types;
pub mod validator;

pub use types::Claim;
pub use validator::{validate, FieldError, ValidationError};
