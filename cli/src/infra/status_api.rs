//! reqwest implementation of the `StatusApi` port.

use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use teectl_common::{ApiAppInfo, AppInfoResponse, Sku, SkuCatalog};

use crate::application::ports::StatusApi;
use crate::domain::error::NetworkError;

/// Per-request timeout for the off-chain API.
pub const API_TIMEOUT: Duration = Duration::from_secs(30);

/// Client for one environment's status API.
pub struct HttpStatusApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpStatusApi {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .user_agent(concat!("teectl/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("cannot build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn unreachable(&self, reason: impl ToString) -> NetworkError {
        NetworkError::ApiUnreachable {
            url: self.base_url.clone(),
            reason: reason.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        tracing::debug!(%url, "GET");
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.unreachable(e))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = resp
            .error_for_status()
            .map_err(|e| self.unreachable(e))?;
        let body = resp.json::<T>().await.map_err(|e| self.unreachable(e))?;
        Ok(Some(body))
    }
}

/// `GET {base}/info?apps=<address>`.
#[must_use]
pub fn info_url(base_url: &str, app: Address) -> String {
    format!("{}/info?apps={app}", base_url.trim_end_matches('/'))
}

/// The entry describing `app`, falling back to a sole unlabelled entry.
#[must_use]
pub fn find_app(apps: Vec<ApiAppInfo>, app: Address) -> Option<ApiAppInfo> {
    let wanted = app.to_string();
    let single = apps.len() == 1;
    let mut fallback = None;
    for entry in apps {
        match entry.address.as_deref() {
            Some(addr) if addr.eq_ignore_ascii_case(&wanted) => return Some(entry),
            None if single => fallback = Some(entry),
            _ => {}
        }
    }
    fallback
}

impl StatusApi for HttpStatusApi {
    async fn app_info(&self, app: Address) -> Result<Option<ApiAppInfo>> {
        let url = info_url(&self.base_url, app);
        let resp: Option<AppInfoResponse> = self.get_json(&url).await?;
        Ok(resp.and_then(|r| find_app(r.apps, app)))
    }

    async fn skus(&self) -> Result<Vec<Sku>> {
        let url = format!("{}/skus", self.base_url);
        let catalog: Option<SkuCatalog> = self.get_json(&url).await?;
        Ok(catalog.map(|c| c.skus).unwrap_or_default())
    }
}
