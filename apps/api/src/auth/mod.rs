// Accounts and request authentication.
// Tokens are HS256 JWTs carried in the `jwt` cookie or an `Authorization: Bearer` header.

pub mod cookie;
pub mod extractor;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod store;

pub use extractor::CurrentUser;

use uuid::Uuid;

use crate::errors::AppError;

/// Rejects access to a record owned by someone else.
pub fn ensure_owner(owner_id: Uuid, caller_id: Uuid) -> Result<(), AppError> {
    if owner_id == caller_id {
        Ok(())
    } else {
        Err(AppError::Unauthorized("Not authorized".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_owner() {
        let me = Uuid::new_v4();
        assert!(ensure_owner(me, me).is_ok());
        assert!(matches!(
            ensure_owner(Uuid::new_v4(), me),
            Err(AppError::Unauthorized(_))
        ));
    }
}
