//! HTTP collaborator of the store.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{
    header::{HeaderMap, HeaderValue, AUTHORIZATION},
    Client, RequestBuilder, StatusCode,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::{Apartment, Appeal, AppealFields, AppealId, Premise},
    error::ErrorBody,
    protocol::{AppealListQuery, ApartmentListQuery, Page, PremiseListQuery, Results},
};
use tracing::debug;

use crate::{config::ClientSettings, error::ApiError};

pub const APPEALS_PATH: &str = "/appeals/v1.0/appeals/";
pub const PREMISES_PATH: &str = "/geo/v2.0/user-premises/";
pub const APARTMENTS_PATH: &str = "/geo/v1.0/apartments/";

pub fn appeal_path(appeal_id: AppealId) -> String {
    format!("{APPEALS_PATH}{}/", appeal_id.0)
}

#[async_trait]
pub trait AppealsApi: Send + Sync {
    async fn list_appeals(&self, query: &AppealListQuery) -> Result<Page<Appeal>, ApiError>;
    async fn list_premises(&self, query: &PremiseListQuery) -> Result<Vec<Premise>, ApiError>;
    async fn list_apartments(&self, query: &ApartmentListQuery)
        -> Result<Vec<Apartment>, ApiError>;
    async fn create_appeal(&self, fields: &AppealFields) -> Result<(), ApiError>;
    async fn update_appeal(
        &self,
        appeal_id: AppealId,
        fields: &AppealFields,
    ) -> Result<(), ApiError>;
}

pub struct HttpAppealsApi {
    http: Client,
    base_url: String,
}

impl HttpAppealsApi {
    /// Plain client without auth or timeout. `base_url` must not end in `/`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &settings.auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .context("auth token is not a valid header value")?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .context("failed to build http client")?;

        Ok(Self {
            http,
            base_url: settings.api_base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn send(
        &self,
        method: &'static str,
        path: &str,
        request: RequestBuilder,
    ) -> Result<String, ApiError> {
        let transport = |source: reqwest::Error| ApiError::Transport {
            method,
            path: path.to_string(),
            source,
        };

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let body = response.text().await.map_err(transport)?;
        debug!("appeals api: {method} {path} status={}", status.as_u16());

        if !status.is_success() {
            return Err(ApiError::rejected(
                method,
                path,
                status.as_u16(),
                rejection_message(status, &body),
            ));
        }

        Ok(body)
    }
}

fn decode<T: DeserializeOwned>(
    method: &'static str,
    path: &str,
    body: &str,
) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode {
        method,
        path: path.to_string(),
        source,
    })
}

fn rejection_message(status: StatusCode, body: &str) -> String {
    if let Some(summary) = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|parsed| parsed.summary())
    {
        return summary;
    }

    let body = body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    status
        .canonical_reason()
        .unwrap_or("request failed")
        .to_string()
}

#[async_trait]
impl AppealsApi for HttpAppealsApi {
    async fn list_appeals(&self, query: &AppealListQuery) -> Result<Page<Appeal>, ApiError> {
        let request = self.http.get(self.url(APPEALS_PATH)).query(query);
        let body = self.send("GET", APPEALS_PATH, request).await?;
        decode("GET", APPEALS_PATH, &body)
    }

    async fn list_premises(&self, query: &PremiseListQuery) -> Result<Vec<Premise>, ApiError> {
        let request = self.http.get(self.url(PREMISES_PATH)).query(query);
        let body = self.send("GET", PREMISES_PATH, request).await?;
        let page: Results<Premise> = decode("GET", PREMISES_PATH, &body)?;
        Ok(page.results)
    }

    async fn list_apartments(
        &self,
        query: &ApartmentListQuery,
    ) -> Result<Vec<Apartment>, ApiError> {
        let request = self.http.get(self.url(APARTMENTS_PATH)).query(query);
        let body = self.send("GET", APARTMENTS_PATH, request).await?;
        decode("GET", APARTMENTS_PATH, &body)
    }

    async fn create_appeal(&self, fields: &AppealFields) -> Result<(), ApiError> {
        let request = self.http.post(self.url(APPEALS_PATH)).json(fields);
        self.send("POST", APPEALS_PATH, request).await?;
        Ok(())
    }

    async fn update_appeal(
        &self,
        appeal_id: AppealId,
        fields: &AppealFields,
    ) -> Result<(), ApiError> {
        let path = appeal_path(appeal_id);
        let request = self.http.patch(self.url(&path)).json(fields);
        self.send("PATCH", &path, request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/api_tests.rs"]
mod tests;
