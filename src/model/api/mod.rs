//! API-compatible types.
//!
//! The types in this module cross the HTTP boundary: request bodies,
//! response bodies, and the auth token cookie.

pub mod auth;
pub mod credentials;
pub mod poll;
pub mod results;
