//! Authentication types for JWT-carried identity.
//!
//! Token issuance and user management live outside this service; Cobro only
//! validates tokens and enforces the role they carry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// JWT claims for access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID).
    pub sub: Uuid,
    /// User's role.
    pub role: String,
    /// Issued at timestamp.
    pub iat: i64,
    /// Expiration timestamp.
    pub exp: i64,
}

impl Claims {
    /// Creates new claims for a user.
    #[must_use]
    pub fn new(user_id: Uuid, role: Role, expires_at: DateTime<Utc>) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            role: role.as_str().to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Returns the user ID from claims.
    #[must_use]
    pub const fn user_id(&self) -> Uuid {
        self.sub
    }

    /// Parses the role claim; unknown roles map to `Viewer`.
    #[must_use]
    pub fn role(&self) -> Role {
        Role::parse(&self.role).unwrap_or(Role::Viewer)
    }
}

/// Caller roles recognized by the billing API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Full access, including client and user administration.
    Admin,
    /// Billing staff: invoices, fee notes, and payments.
    Billing,
    /// Read-only access.
    Viewer,
}

impl Role {
    /// Returns the string form stored in the JWT `role` claim.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Billing => "billing",
            Self::Viewer => "viewer",
        }
    }

    /// Parses a role claim string.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "billing" => Some(Self::Billing),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Whether this role may create, edit, or delete billing documents.
    #[must_use]
    pub const fn can_write_billing(self) -> bool {
        matches!(self, Self::Admin | Self::Billing)
    }
}
