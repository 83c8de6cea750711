//! Argon2id password hashing.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params,
};
use tracing::warn;

/// Outcome of checking a password against a stored hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordVerification {
    Success,
    /// Matches, but the hash uses other parameters than the current ones
    SuccessRehashNeeded,
    Failed,
}

impl PasswordVerification {
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Hashes `password` with a fresh salt, returning a PHC string.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Checks `password` against `hash`. A hash that does not parse never matches.
pub fn verify_password(password: &str, hash: &str) -> PasswordVerification {
    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(err) => {
            warn!(error = %err, "Stored password hash is malformed");
            return PasswordVerification::Failed;
        }
    };

    if Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_err()
    {
        return PasswordVerification::Failed;
    }

    let defaults = Params::default();
    let current = parsed.algorithm == Algorithm::Argon2id.ident()
        && Params::try_from(&parsed).map_or(false, |params| {
            params.m_cost() == defaults.m_cost()
                && params.t_cost() == defaults.t_cost()
                && params.p_cost() == defaults.p_cost()
        });
    if current {
        PasswordVerification::Success
    } else {
        PasswordVerification::SuccessRehashNeeded
    }
}
