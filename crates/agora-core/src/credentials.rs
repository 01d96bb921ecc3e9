//! Salted password hashes.
//!
//! Passwords are hashed with Argon2id and stored as PHC strings
//! (`$argon2id$v=19$...`), which carry their own salt and parameters.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

use crate::errors::CoreError;

/// A stored password hash. Never holds plaintext.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    /// Hash `password` with a fresh random salt.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` for an empty password and
    /// `CoreError::Credential` if hashing fails.
    pub fn new(password: &str) -> Result<Self, CoreError> {
        if password.is_empty() {
            return Err(CoreError::Validation("password must not be empty".into()));
        }
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|hash| Self(hash.to_string()))
            .map_err(|e| CoreError::Credential(format!("failed to hash password: {e}")))
    }

    /// Wrap a PHC string loaded from storage.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Credential` if the string is not a valid PHC hash.
    pub fn from_phc(phc: impl Into<String>) -> Result<Self, CoreError> {
        let phc = phc.into();
        PasswordHash::new(&phc)
            .map_err(|e| CoreError::Credential(format!("invalid password hash: {e}")))?;
        Ok(Self(phc))
    }

    /// Check `password` against this hash.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let cred = Credential::new("correct-horse-battery-staple").unwrap();
        assert!(cred.as_str().starts_with("$argon2"));
        assert!(cred.verify("correct-horse-battery-staple"));
        assert!(!cred.verify("wrong-password"));
    }

    #[test]
    fn salts_differ() {
        let a = Credential::new("same").unwrap();
        let b = Credential::new("same").unwrap();
        assert_ne!(a, b);
        assert!(a.verify("same") && b.verify("same"));
    }

    #[test]
    fn from_phc_roundtrip_and_rejects_garbage() {
        let cred = Credential::new("pw").unwrap();
        let loaded = Credential::from_phc(cred.as_str()).unwrap();
        assert!(loaded.verify("pw"));
        assert!(Credential::from_phc("not-a-hash").is_err());
    }

    #[test]
    fn empty_password_rejected() {
        assert!(matches!(
            Credential::new(""),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn debug_hides_hash() {
        let cred = Credential::new("pw").unwrap();
        assert_eq!(format!("{cred:?}"), "Credential(<redacted>)");
    }
}
