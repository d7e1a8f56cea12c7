//! Authentication and authorization
//!
//! Tokens are HS256 JWTs whose `sub` is the user's UUID and whose `roles`
//! claim lists role names. Authorization is decided by [`AccessPolicy`],
//! keyed by [`Role`] and [`Permission`]; unknown role names grant nothing.

use std::fmt;
use std::str::FromStr;

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_kernel::UserId;

/// Longer expirations are clamped to one year
const MAX_TOKEN_LIFETIME_SECS: u64 = 365 * 24 * 3600;

/// JWT claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// User's roles
    pub roles: Vec<String>,
    /// Expiration timestamp
    pub exp: i64,
    /// Issued at timestamp
    pub iat: i64,
}

impl Claims {
    pub fn user_id(&self) -> Result<UserId, AuthError> {
        self.sub.parse().map_err(|_| AuthError::InvalidSubject)
    }

    /// Recognised roles; unknown names are ignored
    pub fn roles(&self) -> Vec<Role> {
        self.roles.iter().filter_map(|r| r.parse().ok()).collect()
    }
}

/// Auth errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token")]
    InvalidToken,
    #[error("Token expired")]
    TokenExpired,
    #[error("Token subject is not a user id")]
    InvalidSubject,
    #[error("Missing permission: {0}")]
    MissingPermission(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Broker,
    Manager,
    Admin,
    Auditor,
}

impl Role {
    pub const ALL: [Role; 4] = [Role::Broker, Role::Manager, Role::Admin, Role::Auditor];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Broker => "Broker",
            Role::Manager => "Manager",
            Role::Admin => "Admin",
            Role::Auditor => "Auditor",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AuthError;

    /// Case-insensitive
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or(AuthError::InvalidToken)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Permission {
    RequestQuote,
    ViewQuote,
    CreateProposal,
    ViewProposal,
    /// Approve or reject
    DecideProposal,
    RequestDocument,
    ReadAudit,
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Permission::RequestQuote => "request quotes",
            Permission::ViewQuote => "view quotes",
            Permission::CreateProposal => "create proposals",
            Permission::ViewProposal => "view proposals",
            Permission::DecideProposal => "approve or reject proposals",
            Permission::RequestDocument => "request proposal documents",
            Permission::ReadAudit => "read the audit trail",
        };
        f.write_str(name)
    }
}

/// Role to permission table
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy;

impl AccessPolicy {
    pub fn allows(&self, role: Role, permission: Permission) -> bool {
        use Permission::*;
        match role {
            Role::Admin => true,
            Role::Manager => matches!(
                permission,
                RequestQuote | ViewQuote | CreateProposal | ViewProposal | DecideProposal
                    | RequestDocument
            ),
            Role::Broker => matches!(
                permission,
                RequestQuote | ViewQuote | CreateProposal | ViewProposal | RequestDocument
            ),
            Role::Auditor => matches!(
                permission,
                ViewQuote | ViewProposal | RequestDocument | ReadAudit
            ),
        }
    }

    /// The caller's user id when any of their roles grants `permission`
    pub fn authorize(&self, claims: &Claims, permission: Permission) -> Result<UserId, AuthError> {
        let user = claims.user_id()?;
        if claims.roles().into_iter().any(|role| self.allows(role, permission)) {
            Ok(user)
        } else {
            Err(AuthError::MissingPermission(permission.to_string()))
        }
    }
}

/// Creates a new JWT token
///
/// # Arguments
///
/// * `user_id` - User identifier
/// * `roles` - User's roles
/// * `secret` - JWT secret key
/// * `expiration_secs` - Token validity in seconds
pub fn create_token(
    user_id: UserId,
    roles: &[Role],
    secret: &str,
    expiration_secs: u64,
) -> Result<String, AuthError> {
    let now = Utc::now();
    let lifetime = expiration_secs.min(MAX_TOKEN_LIFETIME_SECS) as i64;
    let exp = now + Duration::seconds(lifetime);

    let claims = Claims {
        sub: user_id.as_uuid().to_string(),
        roles: roles.iter().map(|r| r.as_str().to_string()).collect(),
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::InvalidToken)
}

/// Validates a JWT token
///
/// # Arguments
///
/// * `token` - The JWT token to validate
/// * `secret` - JWT secret key
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AuthError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        _ => AuthError::InvalidToken,
    })?;

    Ok(token_data.claims)
}
