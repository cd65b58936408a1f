use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use rentflow_core::{CompanyId, UserId};

use crate::{Actor, CompanyScope, Role};

/// JWT claims model.
///
/// Timestamps are seconds since the Unix epoch, as registered JWT claims are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject / user identifier.
    pub sub: UserId,

    /// Role granted to the subject.
    pub role: Role,

    /// Owning company. Required for clients, absent for platform staff.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,

    /// Issued-at (epoch seconds).
    pub iat: i64,

    /// Expiration (epoch seconds).
    pub exp: i64,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (iat is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,

    #[error("client token carries no company_id")]
    MissingCompany,

    #[error("token rejected: {0}")]
    Malformed(String),
}

impl JwtClaims {
    pub fn new(
        sub: UserId,
        role: Role,
        company_id: Option<CompanyId>,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            sub,
            role,
            company_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        }
    }

    /// Resolve the claims into the actor the core trusts.
    ///
    /// Clients are pinned to their company; staff tokens get platform scope
    /// whatever company they name.
    pub fn into_actor(self) -> Result<Actor, TokenValidationError> {
        let company_scope = match (self.role, self.company_id) {
            (Role::Client, Some(company_id)) => CompanyScope::Company(company_id),
            (Role::Client, None) => return Err(TokenValidationError::MissingCompany),
            (Role::Fulfillment | Role::Admin, _) => CompanyScope::Platform,
        };
        Ok(Actor::new(self.sub, self.role, company_scope))
    }
}

/// Deterministically validate JWT claims.
///
/// Signature verification lives in [`crate::jwt`]; this checks the time window
/// and the role/company pairing only.
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    let now = now.timestamp();
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    if claims.role == Role::Client && claims.company_id.is_none() {
        return Err(TokenValidationError::MissingCompany);
    }
    Ok(())
}
