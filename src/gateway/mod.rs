pub mod dto;
pub mod sqlite;

use std::env;

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::AppError;
use crate::models::{Completion, Course, Module, Profile, ProfilePatch};
use crate::session::Session;

pub use sqlite::SqliteGateway;

#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub base_url: String,
    pub anon_key: String,
}

impl GatewayConfig {
    pub fn new_from_env() -> Result<Self, AppError> {
        let base_url = env::var("GATEWAY_URL")
            .map_err(|_| AppError::Config("GATEWAY_URL is not set".to_string()))?;
        let anon_key = env::var("GATEWAY_ANON_KEY")
            .map_err(|_| AppError::Config("GATEWAY_ANON_KEY is not set".to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key,
        })
    }
}

/// The four table resources the dashboard reads and writes. Every call acts
/// on behalf of `session`.
#[async_trait]
pub trait DashboardGateway: Send + Sync {
    async fn fetch_courses(&self, session: &Session) -> Result<Vec<Course>, AppError>;
    /// Ordered by `order_index` ascending.
    async fn fetch_modules(&self, session: &Session) -> Result<Vec<Module>, AppError>;
    async fn fetch_completions(&self, session: &Session) -> Result<Vec<Completion>, AppError>;
    async fn insert_completions(&self, session: &Session, rows: &[Completion]) -> Result<(), AppError>;
    async fn delete_completion(&self, session: &Session, module_id: &str) -> Result<(), AppError>;
    async fn fetch_profile(&self, session: &Session) -> Result<Option<Profile>, AppError>;
    async fn update_profile(&self, session: &Session, patch: &ProfilePatch) -> Result<(), AppError>;
}

/// External identity provider.
#[async_trait]
pub trait AuthClient: Send + Sync {
    async fn resolve_session(&self, access_token: &str) -> Result<Session, AppError>;
    async fn sign_out(&self, session: &Session) -> Result<(), AppError>;
}

/// Talks to a hosted table service using PostgREST conventions.
pub struct RestGateway {
    client: Client,
    config: GatewayConfig,
}

impl RestGateway {
    pub fn new(config: GatewayConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Config(format!("Failed to build http client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.base_url, table)
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.base_url, path)
    }

    fn request(&self, method: Method, url: &str, bearer: &str) -> RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.config.anon_key)
            .header("Authorization", format!("Bearer {}", bearer))
    }

    async fn read_rows<T: DeserializeOwned>(
        &self,
        session: &Session,
        table: &str,
        query: &[(&str, String)],
    ) -> Result<Vec<T>, AppError> {
        let response = self
            .request(Method::GET, &self.table_url(table), &session.access_token)
            .query(query)
            .send()
            .await
            .map_err(|e| {
                warn!("request for {} failed: {}", table, e);
                AppError::RemoteRead(table.to_string())
            })?;

        let response = check_status(response, table, AppError::RemoteRead).await?;

        response.json::<Vec<T>>().await.map_err(|e| {
            warn!("failed to parse {} rows: {}", table, e);
            AppError::RemoteRead(table.to_string())
        })
    }

    async fn write(&self, request: RequestBuilder, what: &str) -> Result<(), AppError> {
        let response = request.send().await.map_err(|e| {
            warn!("write to {} failed: {}", what, e);
            AppError::RemoteWrite(what.to_string())
        })?;
        check_status(response, what, AppError::RemoteWrite).await?;
        Ok(())
    }
}

/// Completions are only ever written for the signed-in learner.
pub(crate) fn ensure_own_rows(session: &Session, rows: &[Completion]) -> Result<(), AppError> {
    if let Some(row) = rows.iter().find(|r| r.user_id != session.user_id) {
        warn!("refusing completion for {} from session {}", row.user_id, session.user_id);
        return Err(AppError::RemoteWrite("completions".to_string()));
    }
    Ok(())
}

async fn check_status(
    response: Response,
    what: &str,
    kind: fn(String) -> AppError,
) -> Result<Response, AppError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    warn!("gateway error on {} {}: {}", what, status, dto::RemoteErrorBody::describe(&body));
    Err(kind(what.to_string()))
}

#[async_trait]
impl DashboardGateway for RestGateway {
    async fn fetch_courses(&self, session: &Session) -> Result<Vec<Course>, AppError> {
        self.read_rows(session, "courses", &[("select", "*".to_string())])
            .await
    }

    async fn fetch_modules(&self, session: &Session) -> Result<Vec<Module>, AppError> {
        self.read_rows(
            session,
            "modules",
            &[
                ("select", "*".to_string()),
                ("order", "order_index.asc".to_string()),
            ],
        )
        .await
    }

    async fn fetch_completions(&self, session: &Session) -> Result<Vec<Completion>, AppError> {
        self.read_rows(
            session,
            "completions",
            &[
                ("select", "user_id,module_id".to_string()),
                ("user_id", format!("eq.{}", session.user_id)),
            ],
        )
        .await
    }

    async fn insert_completions(&self, session: &Session, rows: &[Completion]) -> Result<(), AppError> {
        ensure_own_rows(session, rows)?;
        let request = self
            .request(Method::POST, &self.table_url("completions"), &session.access_token)
            .header("Prefer", "return=minimal")
            .json(rows);
        self.write(request, "completions").await
    }

    async fn delete_completion(&self, session: &Session, module_id: &str) -> Result<(), AppError> {
        let request = self
            .request(Method::DELETE, &self.table_url("completions"), &session.access_token)
            .query(&[
                ("user_id", format!("eq.{}", session.user_id)),
                ("module_id", format!("eq.{}", module_id)),
            ]);
        self.write(request, "completions").await
    }

    async fn fetch_profile(&self, session: &Session) -> Result<Option<Profile>, AppError> {
        let mut rows: Vec<Profile> = self
            .read_rows(
                session,
                "profiles",
                &[
                    ("select", "*".to_string()),
                    ("id", format!("eq.{}", session.user_id)),
                ],
            )
            .await?;

        if rows.len() > 1 {
            warn!("expected one profile for {}, got {}", session.user_id, rows.len());
        }
        Ok(if rows.is_empty() { None } else { Some(rows.swap_remove(0)) })
    }

    async fn update_profile(&self, session: &Session, patch: &ProfilePatch) -> Result<(), AppError> {
        let request = self
            .request(Method::PATCH, &self.table_url("profiles"), &session.access_token)
            .query(&[("id", format!("eq.{}", session.user_id))])
            .header("Prefer", "return=minimal")
            .json(patch);
        self.write(request, "profile").await
    }
}

#[async_trait]
impl AuthClient for RestGateway {
    async fn resolve_session(&self, access_token: &str) -> Result<Session, AppError> {
        let response = self
            .request(Method::GET, &self.auth_url("user"), access_token)
            .send()
            .await
            .map_err(|e| {
                warn!("identity lookup failed: {}", e);
                AppError::RemoteRead("session".to_string())
            })?;

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(AppError::AuthRequired);
        }
        let response = check_status(response, "session", AppError::RemoteRead).await?;

        let user: dto::AuthUser = response.json().await.map_err(|e| {
            warn!("failed to parse identity: {}", e);
            AppError::RemoteRead("session".to_string())
        })?;

        Ok(Session {
            user_id: user.id,
            email: user.email,
            access_token: access_token.to_string(),
        })
    }

    async fn sign_out(&self, session: &Session) -> Result<(), AppError> {
        let request = self.request(Method::POST, &self.auth_url("logout"), &session.access_token);
        self.write(request, "session").await
    }
}
