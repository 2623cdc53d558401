//! Webhook HTTP client
//!
//! Every call goes through the shared [`RetryExecutor`], so timeouts,
//! backoff and failure logging behave the same for all workflows.

use crate::error::{HttpError, WebhookError};
use crate::payload::{WebhookKind, WebhookPayload};
use crate::response::WebhookResponse;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use studio_retry::{CancellationToken, RetryExecutor, RetryOverrides};

/// Longest response body kept in a status error
const MAX_ERROR_BODY: usize = 512;

/// Endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhooksConfig {
    pub treatment_url: Option<String>,
    pub video_url: Option<String>,
    pub social_post_url: Option<String>,
    pub fiche_url: Option<String>,
    /// Connect timeout for the HTTP client; attempt timeouts come from the retry config
    pub connect_timeout_ms: Option<u64>,
}

impl WebhooksConfig {
    /// Configured URL for a workflow
    #[must_use]
    pub fn url_for(&self, kind: WebhookKind) -> Option<&str> {
        match kind {
            WebhookKind::Treatment => self.treatment_url.as_deref(),
            WebhookKind::Video => self.video_url.as_deref(),
            WebhookKind::SocialPost => self.social_post_url.as_deref(),
            WebhookKind::Fiche => self.fiche_url.as_deref(),
        }
    }

    /// Parse the configured URL for a workflow
    ///
    /// # Errors
    /// - `WebhookError::NotConfigured` when no URL is set
    /// - `WebhookError::InvalidUrl` when it does not parse as http(s)
    pub fn endpoint(&self, kind: WebhookKind) -> Result<Url, WebhookError> {
        let raw = self.url_for(kind).ok_or(WebhookError::NotConfigured(kind))?;
        let invalid = || WebhookError::InvalidUrl {
            kind,
            url: raw.to_string(),
        };
        let url = Url::parse(raw).map_err(|_| invalid())?;
        if matches!(url.scheme(), "http" | "https") {
            Ok(url)
        } else {
            Err(invalid())
        }
    }

    /// Check every configured URL
    ///
    /// # Errors
    /// - `WebhookError::InvalidUrl` for the first URL that does not parse
    pub fn validate(&self) -> Result<(), WebhookError> {
        [
            WebhookKind::Treatment,
            WebhookKind::Video,
            WebhookKind::SocialPost,
            WebhookKind::Fiche,
        ]
        .into_iter()
        .filter(|kind| self.url_for(*kind).is_some())
        .try_for_each(|kind| self.endpoint(kind).map(drop))
    }
}

/// Client for the content generation webhooks
#[derive(Debug, Clone)]
pub struct WebhookClient {
    http: reqwest::Client,
    config: WebhooksConfig,
    executor: RetryExecutor,
}

impl WebhookClient {
    /// Create client
    ///
    /// # Errors
    /// - `WebhookError::InvalidUrl` for a malformed endpoint
    /// - `WebhookError::Client` if the HTTP client cannot be built
    pub fn new(config: WebhooksConfig, executor: RetryExecutor) -> Result<Self, WebhookError> {
        config.validate()?;

        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("content-studio/", env!("CARGO_PKG_VERSION")));
        if let Some(ms) = config.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        let http = builder.build().map_err(WebhookError::Client)?;

        Ok(Self {
            http,
            config,
            executor,
        })
    }

    /// Endpoint configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &WebhooksConfig {
        &self.config
    }

    /// Underlying retry executor
    #[inline]
    #[must_use]
    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    /// Send a payload with the executor's default retry settings
    ///
    /// # Errors
    /// - `WebhookError::InvalidPayload` if validation fails (nothing is sent)
    /// - `WebhookError::NotConfigured` / `InvalidUrl` for a missing endpoint
    /// - `WebhookError::Delivery` when every attempt fails
    pub async fn send(
        &self,
        payload: &WebhookPayload,
        session_id: &str,
    ) -> Result<WebhookResponse, WebhookError> {
        let never = CancellationToken::new();
        self.send_with(payload, session_id, RetryOverrides::none(), |_, _| {}, &never)
            .await
    }

    /// Send a payload with per-call overrides, retry notifications, and a
    /// cancellation token
    ///
    /// # Errors
    /// Same as [`send`](Self::send); cancellation surfaces as a `Delivery` error
    /// for which [`WebhookError::is_cancelled`] holds.
    pub async fn send_with<R>(
        &self,
        payload: &WebhookPayload,
        session_id: &str,
        overrides: RetryOverrides,
        on_retry: R,
        cancel: &CancellationToken,
    ) -> Result<WebhookResponse, WebhookError>
    where
        R: FnMut(u32, Duration),
    {
        payload.validate()?;
        let kind = payload.kind();
        let url = self.config.endpoint(kind)?;

        tracing::info!(session_id, webhook = %kind, url = %url, "Sending webhook");
        let started = Instant::now();

        let http = &self.http;
        let url = &url;
        let response = self
            .executor
            .execute_cancellable(
                |_attempt| post_once(http, url.clone(), payload),
                session_id,
                overrides,
                on_retry,
                cancel,
            )
            .await?;

        tracing::info!(
            session_id,
            webhook = %kind,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            has_image = response.image.is_some(),
            "Webhook completed"
        );
        Ok(response)
    }
}

async fn post_once(
    http: &reqwest::Client,
    url: Url,
    payload: &WebhookPayload,
) -> Result<WebhookResponse, HttpError> {
    let response = http
        .post(url)
        .json(payload)
        .send()
        .await
        .map_err(HttpError::Transport)?;

    let status = response.status();
    let body = response.text().await.map_err(HttpError::Body)?;

    if !status.is_success() {
        return Err(HttpError::Status {
            status: status.as_u16(),
            body: truncate(body, MAX_ERROR_BODY),
        });
    }
    Ok(WebhookResponse::from_body(&body))
}

fn truncate(mut body: String, max: usize) -> String {
    if body.len() > max {
        let mut end = max;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
        body.push_str("...");
    }
    body
}
