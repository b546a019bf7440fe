use std::future::Future;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use thiserror::Error;
use tracing::{debug, warn};

use super::{parse_page_body, FetchError, Page, PageLoader, DEFAULT_FIELDS};

pub const DEFAULT_API_URL: &str = "https://api.artic.edu/api/v1";
pub const DEFAULT_USER_AGENT: &str = concat!("artable/", env!("CARGO_PKG_VERSION"));

type PageRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

#[derive(Clone, Debug)]
pub struct LoaderOptions {
    pub api_url: String,
    pub page_size: Option<u32>,
    pub timeout_seconds: u64,
    pub rate: u32,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub fields: Vec<String>,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            page_size: None,
            timeout_seconds: 10,
            rate: 5,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            fields: DEFAULT_FIELDS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoaderBuildError {
    #[error("invalid api url: {url}")]
    InvalidApiUrl { url: String },

    #[error("invalid rate {value}, expected positive integer")]
    InvalidRate { value: u32 },

    #[error("invalid page size {value}, expected positive integer")]
    InvalidPageSize { value: u32 },

    #[error("invalid user agent '{value}'")]
    InvalidUserAgent { value: String },

    #[error("failed to build HTTP client: {source}")]
    HttpClientBuild {
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to setup proxy: {proxy}: {source}")]
    ProxySetup {
        proxy: String,
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Clone)]
pub struct HttpPageLoader {
    client: reqwest::Client,
    endpoint: String,
    page_size: Option<u32>,
    fields: Option<String>,
    limiter: Arc<PageRateLimiter>,
}

impl std::fmt::Debug for HttpPageLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageLoader")
            .field("endpoint", &self.endpoint)
            .field("page_size", &self.page_size)
            .field("fields", &self.fields)
            .finish()
    }
}

impl HttpPageLoader {
    pub fn new(options: &LoaderOptions) -> Result<Self, LoaderBuildError> {
        let endpoint = format!("{}/artworks", options.api_url.trim().trim_end_matches('/'));
        if reqwest::Url::parse(&endpoint).is_err() {
            return Err(LoaderBuildError::InvalidApiUrl {
                url: options.api_url.clone(),
            });
        }
        let rate = NonZeroU32::new(options.rate)
            .ok_or(LoaderBuildError::InvalidRate { value: options.rate })?;
        if options.page_size == Some(0) {
            return Err(LoaderBuildError::InvalidPageSize { value: 0 });
        }

        let client = build_client(options)?;
        let fields = options
            .fields
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>();
        let fields = if fields.is_empty() {
            None
        } else {
            Some(fields.join(","))
        };

        Ok(Self {
            client,
            endpoint,
            page_size: options.page_size,
            fields,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn page_url(&self, page: u32) -> Result<reqwest::Url, FetchError> {
        let mut params: Vec<(&str, String)> = vec![("page", page.to_string())];
        if let Some(limit) = self.page_size {
            params.push(("limit", limit.to_string()));
        }
        if let Some(fields) = self.fields.as_ref() {
            params.push(("fields", fields.clone()));
        }
        reqwest::Url::parse_with_params(&self.endpoint, &params).map_err(|e| {
            FetchError::Malformed {
                page,
                reason: format!("cannot build request url: {e}"),
            }
        })
    }

    async fn fetch(&self, page: u32) -> Result<Page, FetchError> {
        if page == 0 {
            return Err(FetchError::InvalidPage { page });
        }
        let url = self.page_url(page)?;
        self.limiter.until_ready().await;

        debug!(page, url = %url, "requesting catalog page");
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        let status = response.status();
        if !status.is_success() {
            warn!(page, status = status.as_u16(), "catalog request failed");
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;
        let parsed = parse_page_body(page, &body);
        match parsed.as_ref() {
            Ok(p) => debug!(
                page,
                records = p.records.len(),
                total = p.pagination.total,
                "catalog page loaded"
            ),
            Err(e) => warn!(page, error = %e, "catalog page rejected"),
        }
        parsed
    }
}

impl PageLoader for HttpPageLoader {
    fn load_page(&self, page: u32) -> impl Future<Output = Result<Page, FetchError>> + Send {
        self.fetch(page)
    }
}

fn build_client(options: &LoaderOptions) -> Result<reqwest::Client, LoaderBuildError> {
    let user_agent = reqwest::header::HeaderValue::from_str(options.user_agent.trim())
        .map_err(|_| LoaderBuildError::InvalidUserAgent {
            value: options.user_agent.clone(),
        })?;
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(reqwest::header::USER_AGENT, user_agent.clone());
    headers.insert(
        reqwest::header::HeaderName::from_static("aic-user-agent"),
        user_agent,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let mut builder = reqwest::Client::builder()
        .default_headers(headers)
        .timeout(Duration::from_secs(options.timeout_seconds.max(1)));

    if let Some(proxy) = options.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
        let proxy = reqwest::Proxy::all(proxy).map_err(|e| LoaderBuildError::ProxySetup {
            proxy: proxy.to_string(),
            source: e,
        })?;
        builder = builder.proxy(proxy);
    }

    builder
        .build()
        .map_err(|e| LoaderBuildError::HttpClientBuild { source: e })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_carries_page_limit_and_fields() {
        let loader = HttpPageLoader::new(&LoaderOptions {
            api_url: "https://api.example.test/v1/".to_string(),
            page_size: Some(12),
            fields: vec!["id".to_string(), "title".to_string()],
            ..LoaderOptions::default()
        })
        .unwrap();
        assert_eq!(loader.endpoint(), "https://api.example.test/v1/artworks");
        let url = loader.page_url(3).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.example.test/v1/artworks?page=3&limit=12&fields=id%2Ctitle"
        );
    }

    #[test]
    fn rejects_zero_rate() {
        let err = HttpPageLoader::new(&LoaderOptions {
            rate: 0,
            ..LoaderOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, LoaderBuildError::InvalidRate { value: 0 }));
    }

    #[test]
    fn rejects_unparseable_api_url() {
        let err = HttpPageLoader::new(&LoaderOptions {
            api_url: "not a url".to_string(),
            ..LoaderOptions::default()
        })
        .unwrap_err();
        assert!(matches!(err, LoaderBuildError::InvalidApiUrl { .. }));
    }

    #[tokio::test]
    async fn page_zero_fails_without_network() {
        let loader = HttpPageLoader::new(&LoaderOptions::default()).unwrap();
        let err = loader.load_page(0).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidPage { page: 0 }));
    }
}
