// crates/hot-updater-server/src/auth.rs
// ============================================================================
// Module: Admin Authentication
// Description: Bearer token guard for bundle management routes.
// Purpose: Fail closed on missing or mismatched admin credentials.
// Dependencies: subtle
// ============================================================================

//! ## Overview
//! Management routes accept `Authorization: Bearer <token>` when an admin
//! token is configured. Tokens are compared in constant time. Without a
//! configured token the routes are open and the server logs a warning at
//! startup.

// ============================================================================
// SECTION: Imports
// ============================================================================

use subtle::ConstantTimeEq;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted authorization header size.
const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Admin authentication failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credentials were presented.
    #[error("missing authorization")]
    Missing,
    /// Header is malformed or oversized.
    #[error("invalid authorization header")]
    Malformed,
    /// Token does not match.
    #[error("invalid bearer token")]
    Rejected,
}

// ============================================================================
// SECTION: Guard
// ============================================================================

/// Checks an authorization header against the configured admin token.
///
/// # Errors
///
/// Returns [`AuthError`] when a token is configured and the header does not
/// carry it.
pub fn authorize_admin(expected: Option<&str>, auth_header: Option<&str>) -> Result<(), AuthError> {
    let Some(expected) = expected else {
        return Ok(());
    };
    let token = parse_bearer_token(auth_header)?;
    if bool::from(token.as_bytes().ct_eq(expected.as_bytes())) {
        Ok(())
    } else {
        Err(AuthError::Rejected)
    }
}

/// Extracts the token from a `Bearer` authorization header.
fn parse_bearer_token(auth_header: Option<&str>) -> Result<&str, AuthError> {
    let header = auth_header.ok_or(AuthError::Missing)?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Malformed);
    }
    let (scheme, token) = header.trim().split_once(' ').ok_or(AuthError::Malformed)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Malformed);
    }
    Ok(token)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
