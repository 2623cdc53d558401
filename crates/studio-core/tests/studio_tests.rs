use pretty_assertions::assert_eq;
use serde_json::json;
use std::net::SocketAddr;
use studio_core::{Studio, StudioConfig, StudioError};
use studio_diagnostics::{ErrorContext, GLOBAL_SESSION};
use studio_test_utils::{decode_png_base64, solid_png_base64};
use studio_webhook::{ProductImage, TreatmentRequest, WebhookPayload};
use warp::http::StatusCode;
use warp::Filter;

/// Workflow stub: magenta matte for treatments, 500 for everything else
fn spawn_workflow() -> SocketAddr {
    let matte = solid_png_base64(3, 3, [255, 0, 255, 255]);
    let treatment = warp::post()
        .and(warp::path!("webhook" / "treatment"))
        .map(move || {
            warp::reply::with_status(
                warp::reply::json(&json!({ "image": matte })),
                StatusCode::OK,
            )
        });
    let broken = warp::post()
        .and(warp::path!("webhook" / "video"))
        .map(|| {
            warp::reply::with_status(
                warp::reply::json(&json!({ "message": "boom" })),
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        });

    let (addr, server) = warp::serve(treatment.or(broken)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    addr
}

fn config(addr: SocketAddr, store_dir: &std::path::Path) -> StudioConfig {
    StudioConfig::from_toml_str(&format!(
        r#"
        [retry]
        max_attempts = 2
        initial_delay_ms = 10
        timeout_ms = 2000

        [diagnostics]
        store_dir = "{}"

        [webhooks]
        treatment_url = "http://{addr}/webhook/treatment"
        video_url = "http://{addr}/webhook/video"
        "#,
        store_dir.display()
    ))
    .unwrap()
}

fn treatment(transparent: bool) -> WebhookPayload {
    WebhookPayload::Treatment(TreatmentRequest {
        product_name: "Desk lamp".to_string(),
        treatment: "background_removal".to_string(),
        images: vec![ProductImage::from_bytes("lamp.jpg", "image/jpeg", b"\xff\xd8")],
        transparent_background: transparent,
        instructions: None,
    })
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn studio_lifecycle() {
    let addr = spawn_workflow();
    let dir = tempfile::tempdir().unwrap();
    let studio = Studio::start(config(addr, dir.path())).unwrap();
    assert!(studio.is_started());
    assert!(studio_diagnostics::is_installed());

    // Transparency requested: the matte is keyed out
    let generation = studio.generate(&treatment(true), "lamp-1").await.unwrap();
    let image = generation.image.unwrap();
    assert!(image.keyed);
    assert!(decode_png_base64(&image.data).pixels().all(|p| p.0[3] == 0));

    // Not requested: returned as-is
    let generation = studio.generate(&treatment(false), "lamp-2").await.unwrap();
    assert!(!generation.image.unwrap().keyed);

    // Failing workflow: one durable entry per attempt
    let video = WebhookPayload::Video(studio_webhook::VideoRequest {
        product_name: "Desk lamp".to_string(),
        image: ProductImage::from_bytes("lamp.jpg", "image/jpeg", b"\xff\xd8"),
        prompt: None,
        duration_secs: Some(10),
    });
    let err = studio.generate(&video, "video-1").await.unwrap_err();
    assert!(matches!(err, StudioError::Webhook(_)));
    assert!(err.to_string().contains("Failed after 2 attempts"));

    let persisted = studio.diagnostics().persisted_errors().unwrap();
    assert_eq!(persisted.len(), 2);
    assert!(persisted.iter().all(|e| e.session_id == "video-1"));

    // Panics in monitored tasks land in the global session
    let handle = studio.diagnostics().spawn_monitored("exploding", async {
        if true {
            panic!("kaboom");
        }
        Ok::<(), std::io::Error>(())
    });
    assert_eq!(handle.await.unwrap(), None);
    let global = studio.diagnostics().errors(Some(GLOBAL_SESSION));
    assert_eq!(global.len(), 1);
    assert!(matches!(
        &global[0].context,
        ErrorContext::Global { source, .. } if source == "panic"
    ));

    // A second context in the same process cannot take the handler
    assert!(matches!(
        Studio::start(config(addr, dir.path())),
        Err(StudioError::GlobalHandler(_))
    ));

    studio.shutdown();
    assert!(!studio_diagnostics::is_installed());

    // The durable log outlives the context
    let reopened = Studio::new(config(addr, dir.path())).unwrap();
    let stats = reopened.diagnostics().persisted_stats().unwrap();
    assert_eq!(stats.by_session["video-1"], 2);
    assert_eq!(stats.by_session[GLOBAL_SESSION], 1);
}
