//! `reqwest` implementation of [`ArticleService`] for the article REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header::AUTHORIZATION, Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ArticleDraft, ArticleId, Credentials},
    error::{ApiError, ErrorCode},
    protocol::{ArticleResponse, ArticlesResponse, DeleteResponse, LoginResponse},
};
use tracing::debug;

use crate::{error::ServiceError, ArticleService};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:9000";

pub struct HttpArticleService {
    http: Client,
    server_url: String,
}

impl HttpArticleService {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_timeout(
        server_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(http, server_url))
    }

    pub fn with_client(http: Client, server_url: impl Into<String>) -> Self {
        let server_url = server_url.into().trim_end_matches('/').to_string();
        Self { http, server_url }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    fn login_url(&self) -> String {
        format!("{}/api/login", self.server_url)
    }

    fn articles_url(&self) -> String {
        format!("{}/api/articles", self.server_url)
    }

    fn article_url(&self, id: ArticleId) -> String {
        format!("{}/api/articles/{id}", self.server_url)
    }

    fn authorized(builder: RequestBuilder, token: &str) -> RequestBuilder {
        if token.is_empty() {
            builder
        } else {
            builder.header(AUTHORIZATION, token)
        }
    }
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiError>(&body) {
        Ok(api_error) => api_error.message,
        Err(_) if body.trim().is_empty() => status
            .canonical_reason()
            .unwrap_or("request failed")
            .to_string(),
        Err(_) => body,
    };

    if status == StatusCode::UNAUTHORIZED {
        return Err(ServiceError::Unauthorized { message });
    }
    Err(ServiceError::Status {
        status: status.as_u16(),
        code: ErrorCode::from_status(status.as_u16()),
        message,
    })
}

#[async_trait]
impl ArticleService for HttpArticleService {
    async fn authenticate(&self, credentials: &Credentials) -> Result<LoginResponse, ServiceError> {
        debug!(username = %credentials.username, "http: POST /api/login");
        let response = self
            .http
            .post(self.login_url())
            .json(credentials)
            .send()
            .await?;
        read_json(response).await
    }

    async fn list_articles(&self, token: &str) -> Result<ArticlesResponse, ServiceError> {
        debug!("http: GET /api/articles");
        let response = Self::authorized(self.http.get(self.articles_url()), token)
            .send()
            .await?;
        read_json(response).await
    }

    async fn create(
        &self,
        token: &str,
        article: &ArticleDraft,
    ) -> Result<ArticleResponse, ServiceError> {
        debug!(title = %article.title, "http: POST /api/articles");
        let response = Self::authorized(self.http.post(self.articles_url()), token)
            .json(article)
            .send()
            .await?;
        read_json(response).await
    }

    async fn update(
        &self,
        token: &str,
        article: &ArticleDraft,
        id: ArticleId,
    ) -> Result<ArticleResponse, ServiceError> {
        debug!(article_id = id.0, "http: PUT /api/articles/:id");
        let response = Self::authorized(self.http.put(self.article_url(id)), token)
            .json(article)
            .send()
            .await?;
        read_json(response).await
    }

    async fn delete(&self, token: &str, id: ArticleId) -> Result<DeleteResponse, ServiceError> {
        debug!(article_id = id.0, "http: DELETE /api/articles/:id");
        let response = Self::authorized(self.http.delete(self.article_url(id)), token)
            .send()
            .await?;
        read_json(response).await
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
