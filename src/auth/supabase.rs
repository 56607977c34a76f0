use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{info, instrument};

use super::{AuthError, AuthIdentity, AuthProvider, AuthUserRecord};

/// Client for the hosted auth service (`<base>/auth/v1`).
///
/// Session lookups use the public anon key with the caller's token; admin
/// calls use the service-role key.
#[derive(Clone)]
pub struct SupabaseAuthClient {
    http: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

#[derive(Debug, Deserialize)]
struct SessionUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UserList {
    #[serde(default)]
    users: Vec<AuthUserRecord>,
}

impl SupabaseAuthClient {
    pub fn new(
        base_url: impl Into<String>,
        anon_key: impl Into<String>,
        service_role_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        Ok(Self {
            http: Client::builder().timeout(timeout).build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            service_role_key: service_role_key.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/auth/v1{}", self.base_url, path)
    }

    fn as_service(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }

    async fn body(response: Response) -> Result<String, AuthError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(AuthError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

#[async_trait]
impl AuthProvider for SupabaseAuthClient {
    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<AuthIdentity, AuthError> {
        let response = self
            .http
            .get(self.url("/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if matches!(
            response.status(),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
        ) {
            return Err(AuthError::InvalidSession);
        }

        let body = Self::body(response).await?;
        let user: SessionUser = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        let email = user.email.ok_or(AuthError::InvalidSession)?;
        Ok(AuthIdentity { id: user.id, email })
    }

    #[instrument(skip(self))]
    async fn list_users(&self) -> Result<Vec<AuthUserRecord>, AuthError> {
        let response = self
            .as_service(self.http.get(self.url("/admin/users")))
            .query(&[("per_page", "1000")])
            .send()
            .await?;
        let body = Self::body(response).await?;
        let list: UserList = serde_json::from_str(&body)
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
        Ok(list.users)
    }

    #[instrument(skip(self))]
    async fn ban_user(&self, user_id: &str, ban_duration: &str) -> Result<(), AuthError> {
        let response = self
            .as_service(self.http.put(self.url(&format!("/admin/users/{}", user_id))))
            .json(&json!({ "ban_duration": ban_duration }))
            .send()
            .await?;
        Self::body(response).await?;
        info!(user_id, "user suspended");
        Ok(())
    }

    #[instrument(skip(self, email))]
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &str,
    ) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.url("/recover"))
            .header("apikey", &self.anon_key)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({ "email": email }))
            .send()
            .await?;
        Self::body(response).await?;
        info!("password reset email requested");
        Ok(())
    }
}
