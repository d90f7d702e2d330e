#[cfg(feature = "http")]
use std::time::Duration;

use sleuth_agent::ToolContext;
use sleuth_core::ToolError;
use url::Url;

/// A fetched response, before any status or content checks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedPage {
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// 429 and 5xx are worth retrying; any other non-2xx status is not.
    pub fn ensure_success(&self) -> Result<(), ToolError> {
        match self.status {
            200..=299 => Ok(()),
            429 | 500..=599 => Err(ToolError::Transient(format!(
                "HTTP {} from {}",
                self.status, self.final_url
            ))),
            status => Err(ToolError::Failed(format!(
                "HTTP {status} from {}",
                self.final_url
            ))),
        }
    }

    pub fn is_textual(&self) -> bool {
        let Some(content_type) = self.content_type.as_deref() else {
            return true;
        };
        let content_type = content_type.to_ascii_lowercase();
        content_type.starts_with("text/")
            || content_type.contains("xhtml")
            || content_type.contains("xml")
            || content_type.contains("json")
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|content_type| content_type.to_ascii_lowercase().contains("html"))
            || crate::html::looks_like_html(&self.body)
    }
}

/// Retrieves pages for the page tools. The default backend is plain HTTP; a
/// headless-browser backend can be plugged in behind the same trait.
#[async_trait::async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, ctx: &ToolContext) -> Result<FetchedPage, ToolError>;
}

/// Accepts `example.com/path` style input by assuming `https://`.
pub fn normalize_url(input: &str) -> Result<Url, ToolError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidInput("url must not be empty".to_string()));
    }

    let candidate = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };

    let url = Url::parse(&candidate)
        .map_err(|err| ToolError::InvalidInput(format!("invalid url {trimmed:?}: {err}")))?;
    if url.host_str().map_or(true, str::is_empty) {
        return Err(ToolError::InvalidInput(format!("url {trimmed:?} has no host")));
    }
    Ok(url)
}

pub const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.0 Safari/605.1.15",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36",
];

#[cfg(feature = "http")]
#[derive(Clone, Debug)]
pub struct HttpPageFetcher {
    http: reqwest::Client,
    timeout: Duration,
}

#[cfg(feature = "http")]
impl HttpPageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|err| ToolError::Failed(format!("http client: {err}")))?;
        Ok(Self { http, timeout })
    }

    fn map_error(&self, err: reqwest::Error, url: &Url) -> ToolError {
        if err.is_timeout() {
            ToolError::Timeout(self.timeout)
        } else if err.is_connect() || err.is_request() || err.is_body() {
            ToolError::Transient(format!("request to {url} failed: {err}"))
        } else {
            ToolError::Failed(format!("request to {url} failed: {err}"))
        }
    }
}

#[cfg(feature = "http")]
#[async_trait::async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url, ctx: &ToolContext) -> Result<FetchedPage, ToolError> {
        // A different user agent on every retry.
        let user_agent = USER_AGENTS[ctx.attempt as usize % USER_AGENTS.len()];
        let response = self
            .http
            .get(url.clone())
            .header(reqwest::header::USER_AGENT, user_agent)
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.5")
            .send()
            .await
            .map_err(|err| self.map_error(err, url))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(ToOwned::to_owned);
        let body = response
            .text()
            .await
            .map_err(|err| self.map_error(err, url))?;

        tracing::debug!(%final_url, status, bytes = body.len(), "page fetched");

        Ok(FetchedPage {
            final_url,
            status,
            content_type,
            body,
        })
    }
}
