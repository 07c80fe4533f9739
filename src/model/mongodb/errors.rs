//! For some reason, the mongodb crate doesn't provide error code constants.
//! This module fills in the gaps.

use mongodb::error::{Error as DbError, ErrorKind, WriteFailure};

pub const DUPLICATE_KEY: i32 = 11000;

/// Return true if the given error is a duplicate key write error.
///
/// Inserts that trip a unique index fail with this code; both the vote and
/// user collections rely on it to turn races into well-defined outcomes.
pub fn is_duplicate_key_error(err: &DbError) -> bool {
    if let ErrorKind::Write(WriteFailure::WriteError(ref write_error)) = *err.kind {
        write_error.code == DUPLICATE_KEY
    } else {
        false
    }
}
