use argon2::Config;
use chrono::Utc;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::model::db::user::NewUser;

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Raw login credentials, received from a user. These are never stored
/// directly, since the password is in plaintext.
#[derive(Clone, Deserialize, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl TryFrom<Credentials> for NewUser {
    type Error = Error;

    /// Convert [`Credentials`] to a [`NewUser`] by hashing the password.
    /// This enforces that the email looks plausible and the password meets
    /// the minimum length; client-side validation is not trusted.
    fn try_from(credentials: Credentials) -> Result<Self, Self::Error> {
        if credentials.email.is_empty() || !credentials.email.contains('@') {
            return Err(Error::BadRequest(format!(
                "Invalid email address: {:?}",
                credentials.email
            )));
        }
        if credentials.password.len() < MIN_PASSWORD_LENGTH {
            return Err(Error::BadRequest(format!(
                "Password must be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        // 16 bytes of salt is the recommended amount for argon2.
        let mut salt = [0_u8; 16];
        rand::thread_rng().fill(&mut salt);
        let password_hash =
            argon2::hash_encoded(credentials.password.as_bytes(), &salt, &Config::default())?;

        Ok(Self {
            email: credentials.email,
            password_hash,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod examples {
    use super::*;

    impl Credentials {
        pub fn example() -> Self {
            Self {
                email: "ada@example.com".into(),
                password: "correct-horse-battery-staple".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                email: "grace@example.com".into(),
                password: "first-actual-bug-was-a-moth".into(),
            }
        }

        pub fn empty() -> Self {
            Self {
                email: "".into(),
                password: "".into(),
            }
        }
    }
}
