use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use studio_chroma::ChromaKeyer;
use studio_retry::{CancellationToken, RetryConfig, RetryExecutor, RetryOverrides};
use studio_test_utils::{decode_png_base64, solid_png_base64, test_diagnostics};
use studio_webhook::{
    HttpError, ProductImage, TreatmentRequest, WebhookClient, WebhookError, WebhookPayload,
    WebhooksConfig,
};
use warp::http::StatusCode;
use warp::Filter;

/// Local workflow stub that answers 503 for the first `failures` requests
fn spawn_stub(failures: u32, matte: String) -> (SocketAddr, Arc<AtomicU32>) {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);

    let route = warp::post()
        .and(warp::path!("webhook" / "treatment"))
        .and(warp::body::json())
        .map(move |body: serde_json::Value| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n <= failures {
                warp::reply::with_status(
                    warp::reply::json(&json!({ "message": "workflow busy" })),
                    StatusCode::SERVICE_UNAVAILABLE,
                )
            } else {
                warp::reply::with_status(
                    warp::reply::json(&json!({
                        "image": matte,
                        "transparent": body["transparent_background"],
                        "text": body["product_name"],
                    })),
                    StatusCode::OK,
                )
            }
        });

    let (addr, server) = warp::serve(route).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, hits)
}

fn client(addr: SocketAddr) -> (WebhookClient, Arc<studio_diagnostics::Diagnostics>) {
    let diagnostics = test_diagnostics();
    let executor = RetryExecutor::new(Arc::clone(&diagnostics)).with_config(RetryConfig {
        max_attempts: 3,
        initial_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        backoff_multiplier: 2.0,
        timeout: Duration::from_secs(5),
    });
    let config = WebhooksConfig {
        treatment_url: Some(format!("http://{addr}/webhook/treatment")),
        ..WebhooksConfig::default()
    };
    (WebhookClient::new(config, executor).unwrap(), diagnostics)
}

fn payload() -> WebhookPayload {
    WebhookPayload::Treatment(TreatmentRequest {
        product_name: "Ceramic vase".to_string(),
        treatment: "background_removal".to_string(),
        images: vec![ProductImage::from_bytes("vase.png", "image/png", b"\x89PNG")],
        transparent_background: true,
        instructions: None,
    })
}

#[tokio::test]
async fn retries_until_workflow_answers() {
    let (addr, hits) = spawn_stub(2, solid_png_base64(2, 2, [255, 0, 255, 255]));
    let (client, diagnostics) = client(addr);

    let mut retries = Vec::new();
    let response = client
        .send_with(
            &payload(),
            "session-vase",
            RetryOverrides::none(),
            |attempt, delay| retries.push((attempt, delay)),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    assert_eq!(
        retries,
        vec![
            (1, Duration::from_millis(10)),
            (2, Duration::from_millis(20))
        ]
    );
    assert_eq!(response.text.as_deref(), Some("Ceramic vase"));

    let logged = diagnostics.errors(Some("session-vase"));
    assert_eq!(logged.len(), 2);
    assert!(logged.iter().all(|e| e.error.message.contains("HTTP 503")));

    let display = response
        .generated_image()
        .unwrap()
        .for_display(&ChromaKeyer::default());
    assert!(display.keyed);
    assert!(decode_png_base64(&display.data).pixels().all(|p| p.0[3] == 0));
}

#[tokio::test]
async fn exhausted_retries_surface_last_status() {
    let (addr, hits) = spawn_stub(u32::MAX, String::new());
    let (client, _diagnostics) = client(addr);

    let err = client.send(&payload(), "session-down").await.unwrap_err();

    assert_eq!(hits.load(Ordering::SeqCst), 3);
    match err {
        WebhookError::Delivery(retry) => {
            assert!(retry.is_exhausted());
            assert!(matches!(
                retry.last_attempt().and_then(|a| a.operation_error()),
                Some(HttpError::Status { status: 503, .. })
            ));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn invalid_payload_is_never_sent() {
    let (addr, hits) = spawn_stub(0, String::new());
    let (client, diagnostics) = client(addr);

    let mut bad = payload();
    if let WebhookPayload::Treatment(request) = &mut bad {
        request.images.clear();
    }

    assert!(matches!(
        client.send(&bad, "session-bad").await,
        Err(WebhookError::InvalidPayload(_))
    ));
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(diagnostics.errors(None).is_empty());
}

#[tokio::test]
async fn cancelled_send_reports_cancellation() {
    let (addr, _hits) = spawn_stub(u32::MAX, String::new());
    let (client, _diagnostics) = client(addr);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    let err = client
        .send_with(
            &payload(),
            "session-cancel",
            RetryOverrides::none(),
            move |_, _| trigger.cancel(),
            &cancel,
        )
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
}
