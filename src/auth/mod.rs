//! Auth collaborator and admin authorization.
//!
//! Identities come from the hosted auth provider. Admin rights are a local
//! decision: the verified email is checked against an [`AdminPolicy`]
//! built from configuration and injected into [`SessionResolver`].

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::{collections::HashSet, sync::Arc};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{errors::ServiceError, models::Role, AppState};

pub mod supabase;

pub use supabase::SupabaseAuthClient;

/// Ban duration used for suspensions; long enough to be permanent in practice.
pub const PERMANENT_BAN_DURATION: &str = "876000h";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("auth provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("auth provider rejected request (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("session token is invalid or expired")]
    InvalidSession,

    #[error("auth provider returned an unexpected response: {0}")]
    InvalidResponse(String),
}

impl AuthError {
    /// True when the provider refused the caller's credentials, as opposed to failing.
    pub fn is_rejection(&self) -> bool {
        matches!(self, AuthError::InvalidSession)
    }
}

/// Verified identity behind a session token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthIdentity {
    pub id: String,
    pub email: String,
}

/// Account record as listed by the provider's admin API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AuthUserRecord {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub banned_until: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sign_in_count: u32,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Resolves a bearer token to the identity it belongs to.
    async fn get_user(&self, access_token: &str) -> Result<AuthIdentity, AuthError>;

    async fn list_users(&self) -> Result<Vec<AuthUserRecord>, AuthError>;

    async fn ban_user(&self, user_id: &str, ban_duration: &str) -> Result<(), AuthError>;

    async fn reset_password_for_email(&self, email: &str, redirect_to: &str)
        -> Result<(), AuthError>;
}

/// Provider used when no auth service is configured. Every session is
/// rejected, so admin endpoints stay closed; listing yields no users.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledAuth;

#[async_trait]
impl AuthProvider for DisabledAuth {
    async fn get_user(&self, _access_token: &str) -> Result<AuthIdentity, AuthError> {
        Err(AuthError::InvalidSession)
    }

    async fn list_users(&self) -> Result<Vec<AuthUserRecord>, AuthError> {
        Ok(Vec::new())
    }

    async fn ban_user(&self, _user_id: &str, _ban_duration: &str) -> Result<(), AuthError> {
        Err(AuthError::InvalidResponse("auth provider not configured".into()))
    }

    async fn reset_password_for_email(
        &self,
        _email: &str,
        _redirect_to: &str,
    ) -> Result<(), AuthError> {
        Err(AuthError::InvalidResponse("auth provider not configured".into()))
    }
}

/// Allowlist of admin emails, compared case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AdminPolicy {
    admins: HashSet<String>,
}

impl AdminPolicy {
    /// Parses a comma-separated allowlist; blank entries are ignored.
    pub fn from_allowlist(raw: &str) -> Self {
        Self {
            admins: raw
                .split(',')
                .map(|email| email.trim().to_ascii_lowercase())
                .filter(|email| !email.is_empty())
                .collect(),
        }
    }

    pub fn is_admin(&self, email: &str) -> bool {
        self.admins.contains(&email.trim().to_ascii_lowercase())
    }

    pub fn role_for(&self, email: &str) -> Role {
        if self.is_admin(email) {
            Role::Admin
        } else {
            Role::User
        }
    }

    pub fn is_empty(&self) -> bool {
        self.admins.is_empty()
    }
}

/// Turns bearer tokens into admin sessions: the token is verified with the
/// auth provider first, then the verified email is checked against the policy.
#[derive(Clone)]
pub struct SessionResolver {
    provider: Arc<dyn AuthProvider>,
    policy: AdminPolicy,
}

impl SessionResolver {
    pub fn new(provider: Arc<dyn AuthProvider>, policy: AdminPolicy) -> Self {
        Self { provider, policy }
    }

    pub fn policy(&self) -> &AdminPolicy {
        &self.policy
    }

    pub async fn resolve_admin(&self, access_token: &str) -> Result<AdminSession, ServiceError> {
        let identity = self.provider.get_user(access_token).await.map_err(|err| {
            if err.is_rejection() {
                ServiceError::Unauthorized("invalid or expired session".into())
            } else {
                ServiceError::AuthError(err)
            }
        })?;

        if !self.policy.is_admin(&identity.email) {
            warn!(user_id = %identity.id, "non-admin attempted admin access");
            return Err(ServiceError::Forbidden("admin access required".into()));
        }

        debug!(user_id = %identity.id, "admin session resolved");
        Ok(AdminSession { identity })
    }
}

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Extractor for handlers that require a verified admin.
#[derive(Debug, Clone)]
pub struct AdminSession {
    pub identity: AuthIdentity,
}

#[async_trait]
impl FromRequestParts<AppState> for AdminSession {
    type Rejection = ServiceError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)
            .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".into()))?;
        state.sessions.resolve_admin(token).await
    }
}

/// Proof that the operator explicitly confirmed an irreversible action.
#[derive(Debug)]
pub struct Confirmation(());

impl Confirmation {
    pub fn from_flag(confirmed: bool, action: &str) -> Result<Self, ServiceError> {
        if confirmed {
            Ok(Confirmation(()))
        } else {
            Err(ServiceError::ValidationError(format!(
                "{} requires explicit confirmation (confirm: true)",
                action
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    struct StaticProvider;

    #[async_trait]
    impl AuthProvider for StaticProvider {
        async fn get_user(&self, access_token: &str) -> Result<AuthIdentity, AuthError> {
            match access_token {
                "admin-token" => Ok(AuthIdentity {
                    id: "u1".into(),
                    email: "Owner@Firm.example".into(),
                }),
                "user-token" => Ok(AuthIdentity {
                    id: "u2".into(),
                    email: "visitor@example.com".into(),
                }),
                "broken" => Err(AuthError::Api {
                    status: 503,
                    body: "down".into(),
                }),
                _ => Err(AuthError::InvalidSession),
            }
        }

        async fn list_users(&self) -> Result<Vec<AuthUserRecord>, AuthError> {
            Ok(Vec::new())
        }

        async fn ban_user(&self, _: &str, _: &str) -> Result<(), AuthError> {
            Ok(())
        }

        async fn reset_password_for_email(&self, _: &str, _: &str) -> Result<(), AuthError> {
            Ok(())
        }
    }

    fn resolver() -> SessionResolver {
        SessionResolver::new(
            Arc::new(StaticProvider),
            AdminPolicy::from_allowlist(" owner@firm.example , ,ops@firm.example"),
        )
    }

    #[test]
    fn allowlist_is_trimmed_and_case_insensitive() {
        let policy = AdminPolicy::from_allowlist(" owner@firm.example , ,OPS@firm.example");
        assert!(policy.is_admin("OWNER@firm.example"));
        assert!(policy.is_admin("ops@firm.example"));
        assert!(!policy.is_admin(""));
        assert_eq!(policy.role_for("someone@else.com"), Role::User);
    }

    #[test]
    fn blank_allowlist_admits_nobody() {
        let policy = AdminPolicy::from_allowlist(" , ");
        assert!(policy.is_empty());
        assert!(!policy.is_admin("owner@firm.example"));
        assert!(!AdminPolicy::from_allowlist("owner@firm.example").is_empty());
    }

    #[tokio::test]
    async fn admin_token_resolves() {
        let session = resolver().resolve_admin("admin-token").await.unwrap();
        assert_eq!(session.identity.id, "u1");
    }

    #[tokio::test]
    async fn verified_non_admin_is_forbidden() {
        let err = resolver().resolve_admin("user-token").await.unwrap_err();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let err = resolver().resolve_admin("forged").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn provider_outage_is_not_reported_as_bad_credentials() {
        let err = resolver().resolve_admin("broken").await.unwrap_err();
        assert!(matches!(err, ServiceError::AuthError(_)));
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(bearer_token(&headers), None);
    }

    #[tokio::test]
    async fn disabled_auth_keeps_admin_closed() {
        let resolver = SessionResolver::new(
            Arc::new(DisabledAuth),
            AdminPolicy::from_allowlist("owner@firm.example"),
        );
        let err = resolver.resolve_admin("anything").await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
        assert!(DisabledAuth.list_users().await.unwrap().is_empty());
        assert!(DisabledAuth.ban_user("u1", PERMANENT_BAN_DURATION).await.is_err());
    }

    #[test]
    fn confirmation_requires_flag() {
        assert!(Confirmation::from_flag(true, "suspend").is_ok());
        assert!(matches!(
            Confirmation::from_flag(false, "suspend"),
            Err(ServiceError::ValidationError(_))
        ));
    }
}
