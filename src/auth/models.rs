//! Authentication data models

use serde::Deserialize;

/// Fixed domain for synthetic emails linking LINE identities to local accounts
pub const SYNTHETIC_EMAIL_DOMAIN: &str = "line.interconnect.app";

/// Request body for LINE authentication
///
/// Both fields are declared optional so an incomplete body reaches the
/// handler and gets a JSON 400 instead of a bare extractor rejection.
#[derive(Deserialize)]
pub struct LineAuthPayload {
    pub code: Option<String>,
    pub redirect_uri: Option<String>,
}

/// Compute the synthetic email acting as the natural key for a LINE identity.
///
/// LINE does not supply a real email address, so the account store is keyed
/// by this deterministic placeholder: the same LINE user id always maps to
/// the same address.
pub fn synthetic_email(line_user_id: &str) -> String {
    format!("line_{}@{}", line_user_id, SYNTHETIC_EMAIL_DOMAIN)
}
