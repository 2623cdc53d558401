//! Studio application context
//!
//! Owns the process-wide services and wires them together:
//! - [`Diagnostics`] sink, shared by `Arc`
//! - [`RetryExecutor`] bound to the shutdown token
//! - [`ChromaKeyer`] and [`WebhookClient`] built from configuration

use crate::config::StudioConfig;
use crate::error::StudioError;
use std::sync::Arc;
use studio_chroma::ChromaKeyer;
use studio_diagnostics::{
    Diagnostics, FileStore, GlobalHandlerGuard, KeyValueStore, MemoryStore,
};
use studio_retry::{CancellationToken, RetryExecutor};
use studio_webhook::{DisplayImage, WebhookClient, WebhookPayload, WebhookResponse};

/// Result of one generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Raw webhook response
    pub response: WebhookResponse,
    /// Image prepared for display, when the workflow returned one
    pub image: Option<DisplayImage>,
}

/// Application context
#[derive(Debug)]
pub struct Studio {
    config: StudioConfig,
    diagnostics: Arc<Diagnostics>,
    executor: RetryExecutor,
    keyer: ChromaKeyer,
    webhooks: WebhookClient,
    shutdown: CancellationToken,
    global_handler: Option<GlobalHandlerGuard>,
}

impl Studio {
    /// Build the context without touching process-wide state
    ///
    /// # Errors
    /// - `StudioError::Config` if the configuration is invalid
    /// - `StudioError::Store` if the durable store directory cannot be opened
    /// - `StudioError::Webhook` if the HTTP client cannot be built
    pub fn new(config: StudioConfig) -> Result<Self, StudioError> {
        config.validate()?;

        let store: Arc<dyn KeyValueStore> = match &config.diagnostics.store_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };
        let diagnostics = Arc::new(Diagnostics::new(&config.diagnostics.settings, store));

        let shutdown = CancellationToken::new();
        let executor = RetryExecutor::new(Arc::clone(&diagnostics))
            .with_config(config.retry)
            .with_shutdown(shutdown.clone());
        let keyer = ChromaKeyer::from_config(&config.chroma)?;
        let webhooks = WebhookClient::new(config.webhooks.clone(), executor.clone())?;

        tracing::info!(
            durable = config.diagnostics.store_dir.is_some(),
            max_attempts = config.retry.max_attempts,
            key_color = %config.chroma.key_color,
            "Studio initialized"
        );

        Ok(Self {
            config,
            diagnostics,
            executor,
            keyer,
            webhooks,
            shutdown,
            global_handler: None,
        })
    }

    /// Build the context and install the global error handler
    ///
    /// # Errors
    /// Same as [`new`](Self::new), plus `StudioError::GlobalHandler` if another
    /// handler is live in this process
    pub fn start(config: StudioConfig) -> Result<Self, StudioError> {
        let mut studio = Self::new(config)?;
        studio.global_handler = Some(studio.diagnostics.install_global_handler()?);
        tracing::info!("Studio started");
        Ok(studio)
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn diagnostics(&self) -> &Arc<Diagnostics> {
        &self.diagnostics
    }

    #[inline]
    #[must_use]
    pub fn executor(&self) -> &RetryExecutor {
        &self.executor
    }

    #[inline]
    #[must_use]
    pub fn keyer(&self) -> &ChromaKeyer {
        &self.keyer
    }

    #[inline]
    #[must_use]
    pub fn webhooks(&self) -> &WebhookClient {
        &self.webhooks
    }

    /// Token cancelled on shutdown
    #[inline]
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Whether the global handler is held by this context
    #[inline]
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.global_handler.is_some()
    }

    /// Send a payload and prepare any returned image for display
    ///
    /// The image is keyed when the response flags it as transparent or the
    /// payload asked for a transparent background.
    ///
    /// # Errors
    /// - `StudioError::ShuttingDown` if shutdown began before or during the call
    /// - `StudioError::Webhook` for validation, configuration or delivery failures
    pub async fn generate(
        &self,
        payload: &WebhookPayload,
        session_id: &str,
    ) -> Result<Generation, StudioError> {
        if self.shutdown.is_cancelled() {
            return Err(StudioError::ShuttingDown);
        }

        let response = match self.webhooks.send(payload, session_id).await {
            Ok(response) => response,
            Err(e) if e.is_cancelled() => return Err(StudioError::ShuttingDown),
            Err(e) => return Err(e.into()),
        };

        let image = response.generated_image().map(|mut image| {
            image.transparent |= payload.wants_transparency();
            image.for_display(&self.keyer)
        });

        Ok(Generation { response, image })
    }

    /// Key a local image file's bytes into PNG bytes
    ///
    /// # Errors
    /// - `StudioError::Chroma` if the bytes cannot be decoded or keyed
    pub fn key_image(&self, bytes: &[u8]) -> Result<Vec<u8>, StudioError> {
        Ok(self.keyer.apply_bytes(bytes)?)
    }

    /// Cancel in-flight executions and uninstall the global handler
    pub fn shutdown(mut self) {
        self.shutdown.cancel();
        drop(self.global_handler.take());
        tracing::info!("Studio shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_test_utils::{decode_png_base64, png_bytes, solid_png_base64};
    use studio_webhook::{FicheRequest, WebhooksConfig};

    #[test]
    fn builds_in_memory_by_default() {
        let studio = Studio::new(StudioConfig::default()).unwrap();
        assert!(!studio.is_started());
        assert!(studio.diagnostics().persisted_errors().unwrap().is_empty());
        assert_eq!(studio.executor().config().max_attempts, 3);
    }

    #[test]
    fn builds_with_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = StudioConfig::default();
        config.diagnostics.store_dir = Some(dir.path().join("errors"));

        let studio = Studio::new(config).unwrap();
        assert!(studio.diagnostics().persisted_errors().unwrap().is_empty());
        assert!(dir.path().join("errors").is_dir());
    }

    #[test]
    fn key_image_uses_configured_color() {
        let mut config = StudioConfig::default();
        config.chroma.key_color = "#00FF00".parse().unwrap();
        let studio = Studio::new(config).unwrap();

        let source = decode_png_base64(&solid_png_base64(2, 1, [0, 255, 0, 255]));
        let keyed = studio.key_image(&png_bytes(&source)).unwrap();
        let keyed = image::load_from_memory(&keyed).unwrap().into_rgba8();

        assert!(keyed.pixels().all(|p| p.0[3] == 0));
    }

    #[tokio::test]
    async fn generate_after_shutdown_is_refused() {
        let config = StudioConfig {
            webhooks: WebhooksConfig {
                fiche_url: Some("http://127.0.0.1:9/webhook/fiche".to_string()),
                ..WebhooksConfig::default()
            },
            ..StudioConfig::default()
        };
        let studio = Studio::new(config).unwrap();
        let token = studio.shutdown_token().clone();
        token.cancel();

        let payload = WebhookPayload::Fiche(FicheRequest {
            product_name: "Lamp".to_string(),
            reference: None,
            features: vec![],
            images: vec![],
        });
        assert!(matches!(
            studio.generate(&payload, "s").await,
            Err(StudioError::ShuttingDown)
        ));
    }
}
