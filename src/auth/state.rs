//! Authentication state traits and macro.

use crate::jwt::JwtConfig;

/// Trait for state types that can verify access tokens.
pub trait HasJwt {
    fn jwt(&self) -> &JwtConfig;
}

/// Macro to implement `HasJwt` for state structs with a `jwt: Arc<JwtConfig>`
/// field.
#[macro_export]
macro_rules! impl_has_jwt {
    ($state_type:ty) => {
        impl $crate::auth::HasJwt for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
        }
    };
}
