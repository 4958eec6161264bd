use std::fmt;

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::decode_header;
use serde::Deserialize;
use thiserror::Error;

/// Role
///
/// Privilege level of whoever is acting. Variants are declared in ascending privilege, so the
/// derived ordering is the privilege ordering (`Guest < User < Admin`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Role {
    /// No usable token.
    #[default]
    Guest,
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    /// Parses a role claim value. `Guest` is not a role a token can claim.
    pub fn from_claim(value: &str) -> Option<Self> {
        let value = value.trim();
        if value.eq_ignore_ascii_case("admin") {
            Some(Role::Admin)
        } else if value.eq_ignore_ascii_case("user") {
            Some(Role::User)
        } else {
            None
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// IdentityClaims
///
/// The part of a bearer token payload this client relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    /// Identifier of the user the token was issued to.
    pub subject: String,
    pub role: Role,
    /// `exp` as a Unix timestamp, when the token carries one.
    pub expires_at: Option<i64>,
}

impl IdentityClaims {
    /// Whether the claims are past their `exp` at `now` (Unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// DecodeFailure
///
/// Every reason a token can fail to yield [`IdentityClaims`]. Callers outside this module only
/// ever see these as a downgrade to `Guest`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeFailure {
    #[error("token is empty")]
    Empty,
    #[error("token is not a three-segment JWT")]
    Shape,
    #[error("token header is invalid: {0}")]
    Header(String),
    #[error("token payload is not base64url: {0}")]
    Encoding(String),
    #[error("token payload is not a claim set: {0}")]
    Payload(String),
    #[error("token has no subject claim")]
    MissingSubject,
    #[error("token has no recognised role claim")]
    MissingRole,
    #[error("token expired at {0}")]
    Expired(i64),
}

/// Raw payload shape. Issuers disagree on claim names and shapes, so everything is optional here
/// and the rules live in [`RawClaims::into_claims`].
#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<SubjectClaim>,
    // ASP.NET Core issues the user id under `nameid`.
    #[serde(default)]
    nameid: Option<SubjectClaim>,
    #[serde(default)]
    role: Option<RoleClaim>,
    #[serde(default)]
    exp: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SubjectClaim {
    Text(String),
    Number(i64),
}

impl SubjectClaim {
    fn into_subject(self) -> Option<String> {
        match self {
            SubjectClaim::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| text.to_string())
            }
            SubjectClaim::Number(n) => Some(n.to_string()),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RoleClaim {
    One(String),
    Many(Vec<String>),
}

impl RoleClaim {
    /// The highest-privileged recognised role in the claim.
    fn highest(&self) -> Option<Role> {
        match self {
            RoleClaim::One(value) => Role::from_claim(value),
            RoleClaim::Many(values) => values.iter().filter_map(|v| Role::from_claim(v)).max(),
        }
    }
}

impl RawClaims {
    fn into_claims(self, now: i64) -> Result<IdentityClaims, DecodeFailure> {
        if let Some(exp) = self.exp {
            if exp <= now {
                return Err(DecodeFailure::Expired(exp));
            }
        }

        let subject = self
            .sub
            .and_then(SubjectClaim::into_subject)
            .or_else(|| self.nameid.and_then(SubjectClaim::into_subject))
            .ok_or(DecodeFailure::MissingSubject)?;

        let role = self
            .role
            .as_ref()
            .and_then(RoleClaim::highest)
            .ok_or(DecodeFailure::MissingRole)?;

        Ok(IdentityClaims {
            subject,
            role,
            expires_at: self.exp,
        })
    }
}

/// decode_claims
///
/// Reads the identity claims out of a bearer token without verifying its signature. The server
/// verifies every request; this client only needs to know who it is acting as.
///
/// The header segment must be a well-formed JWT header and the payload must be base64url JSON
/// carrying a subject (`sub`, or `nameid`) and a recognised `role`. A token whose `exp` has
/// passed is rejected as well.
pub fn decode_claims(token: &str) -> Result<IdentityClaims, DecodeFailure> {
    let token = token.trim();
    if token.is_empty() {
        return Err(DecodeFailure::Empty);
    }

    let mut segments = token.split('.');
    let (Some(_), Some(payload), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(DecodeFailure::Shape);
    };

    decode_header(token).map_err(|e| DecodeFailure::Header(e.to_string()))?;

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|e| DecodeFailure::Encoding(e.to_string()))?;

    let raw: RawClaims =
        serde_json::from_slice(&bytes).map_err(|e| DecodeFailure::Payload(e.to_string()))?;

    raw.into_claims(Utc::now().timestamp())
}

/// Session
///
/// The identity derived from the current bearer token. A `Session` is only ever produced from a
/// token, so `user_id()` and a non-guest `role()` exist exactly when the token decoded and its
/// `exp` has not passed yet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    raw_token: Option<String>,
    claims: Option<IdentityClaims>,
}

impl Session {
    /// The session of nobody.
    pub fn guest() -> Self {
        Self::default()
    }

    /// Derives a session from a stored token. Undecodable tokens are kept as the raw token but
    /// yield no identity.
    pub fn from_token(raw_token: Option<String>) -> Self {
        let claims = raw_token
            .as_deref()
            .and_then(|token| match decode_claims(token) {
                Ok(claims) => Some(claims),
                Err(failure) => {
                    tracing::warn!(%failure, "bearer token rejected, acting as guest");
                    None
                }
            });

        Self { raw_token, claims }
    }

    pub fn raw_token(&self) -> Option<&str> {
        self.raw_token.as_deref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.claims().map(|c| c.subject.as_str())
    }

    pub fn role(&self) -> Role {
        self.claims().map_or(Role::Guest, |c| c.role)
    }

    /// claims
    ///
    /// The decoded claims while the token is still valid. Expiry is checked on every call, so a
    /// session whose token runs out mid-process turns into a guest from that moment on.
    pub fn claims(&self) -> Option<&IdentityClaims> {
        self.claims_at(Utc::now().timestamp())
    }

    pub fn is_authenticated(&self) -> bool {
        self.claims().is_some()
    }

    fn claims_at(&self, now: i64) -> Option<&IdentityClaims> {
        self.claims.as_ref().filter(|c| !c.is_expired_at(now))
    }
}
