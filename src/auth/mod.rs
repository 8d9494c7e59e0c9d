//! Session authentication.
//!
//! Clients present an opaque session token; only its SHA-256 digest is
//! stored, and lookups go through the document store.

pub mod extractor;
pub mod token;

pub use extractor::{authenticate, protect, AuthUser, SESSION_COOKIE};
