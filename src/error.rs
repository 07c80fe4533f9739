use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::Responder,
};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Application errors.
///
/// Expected outcomes are not errors; in particular a resubmission by a user
/// who has already voted is reported via
/// [`CastOutcome`](crate::model::db::vote::CastOutcome), not here.
#[derive(Debug, Error)]
pub enum Error {
    /// The submitted option is not in the configured option set.
    #[error("Invalid option: {0:?}")]
    InvalidOption(String),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    BsonDeserialize(#[from] mongodb::bson::de::Error),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'o> {
        let status = match &self {
            Self::InvalidOption(_) => Status::UnprocessableEntity,
            // The database being unreachable is a temporary condition; tell
            // clients to retry later rather than claiming a server bug.
            Self::Db(_) => Status::ServiceUnavailable,
            Self::BsonDeserialize(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::BadRequest,
            },
            Self::Argon2(_) | Self::BadRequest(_) => Status::BadRequest,
            Self::Unauthorized(_) => Status::Unauthorized,
        };

        match status.class() {
            StatusClass::ServerError => error!("{status}: {self}"),
            _ => warn!("{status}: {self}"),
        }

        Err(status)
    }
}
