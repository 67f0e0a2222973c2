mod common;

use std::time::Duration;

use common::{client_for, scan_metadata, status_body, KEY};
use garak_sdk::{
    CreateScanRequest, GarakError, ListScansQuery, ScanStatus, ScanStatusResponse,
    UpdateScanRequest, WaitOptions,
};
use httpmock::prelude::*;
use httpmock::Method::PATCH;
use serde_json::json;

#[tokio::test]
async fn create_sends_credentials_and_returns_scan() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/v1/scans")
                .header("authorization", format!("Bearer {KEY}"))
                .header("x-api-key", KEY)
                .json_body_partial(
                    r#"{"generator":"openai","model_name":"gpt-4","probe_categories":["jailbreak"]}"#,
                );
            then.status(201).json_body(json!({
                "scan_id": "S1",
                "metadata": scan_metadata("S1", "pending"),
                "free_tier": false,
                "remaining_free_scans": 2
            }));
        })
        .await;

    let client = client_for(&server);
    let request = CreateScanRequest::new("openai", "gpt-4").probe_categories(["jailbreak"]);
    let scan = client.scans().create(&request).await.unwrap();

    mock.assert_async().await;
    assert_eq!(scan.id(), "S1");
    assert_eq!(scan.status(), ScanStatus::Pending);
    assert_eq!(scan.metadata.model_name, "gpt-4");
}

#[tokio::test]
async fn create_flagged_for_subscription_is_quota_exceeded() {
    let server = MockServer::start_async().await;
    let mut metadata = scan_metadata("S1", "pending");
    metadata["needs_subscription"] = json!(true);
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/scans");
            then.status(201)
                .json_body(json!({ "scan_id": "S1", "metadata": metadata }));
        })
        .await;

    let client = client_for(&server);
    let err = client
        .scans()
        .create(&CreateScanRequest::new("openai", "gpt-4"))
        .await
        .unwrap_err();

    assert!(matches!(err, GarakError::QuotaExceeded { .. }), "{err:?}");
    assert_eq!(err.response().map(|raw| raw.status), Some(201));
}

#[tokio::test]
async fn create_rejected_by_service_keeps_error_code() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/scans");
            then.status(422).json_body(json!({
                "error_code": "invalid_model",
                "message": "Model gpt-99 is not supported"
            }));
        })
        .await;

    let client = client_for(&server);
    let err = client
        .scans()
        .create(&CreateScanRequest::new("openai", "gpt-99"))
        .await
        .unwrap_err();

    match err {
        GarakError::Api {
            message,
            status_code,
            error_code,
            response,
        } => {
            assert_eq!(message, "Model gpt-99 is not supported");
            assert_eq!(status_code, Some(422));
            assert_eq!(error_code.as_deref(), Some("invalid_model"));
            assert_eq!(response.map(|raw| raw.status), Some(422));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn update_rejected_by_service_keeps_error_code() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(PATCH).path("/api/v1/scans/S1");
            then.status(400)
                .json_body(json!({ "error": "name_too_long", "detail": "name exceeds 200 characters" }));
        })
        .await;

    let client = client_for(&server);
    let update = UpdateScanRequest {
        name: Some("x".repeat(300)),
        description: None,
    };
    let err = client.scans().update("S1", &update).await.unwrap_err();

    assert!(
        matches!(
            err,
            GarakError::Api { status_code: Some(400), ref error_code, .. }
                if error_code.as_deref() == Some("name_too_long")
        ),
        "{err:?}"
    );
    assert_eq!(err.message(), "name exceeds 200 characters");
}

#[tokio::test]
async fn invalid_request_never_reaches_the_service() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/scans");
            then.status(201);
        })
        .await;

    let client = client_for(&server);
    let err = client
        .scans()
        .create(&CreateScanRequest::new("openai", "  "))
        .await
        .unwrap_err();

    assert!(matches!(err, GarakError::ScanValidation { .. }));
    assert_eq!(mock.hits_async().await, 0);
}

#[tokio::test]
async fn unauthorized_maps_to_authentication_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/status");
            then.status(401)
                .json_body(json!({ "detail": "Invalid API key" }));
        })
        .await;

    let client = client_for(&server);
    let err = client.scans().status("S1", false).await.unwrap_err();

    assert!(matches!(err, GarakError::Authentication { .. }));
    assert!(err.to_string().contains("Authentication failed"));
    assert_eq!(err.status_code(), Some(401));
}

#[tokio::test]
async fn rate_limit_reads_retry_after_when_present() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/status");
            then.status(429)
                .header("Retry-After", "30")
                .json_body(json!({ "message": "slow down" }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S2/status");
            then.status(429);
        })
        .await;

    let client = client_for(&server);
    let err = client.scans().status("S1", false).await.unwrap_err();
    assert!(matches!(err, GarakError::RateLimit { .. }));
    assert_eq!(err.retry_after(), Some(30));

    let err = client.scans().status("S2", false).await.unwrap_err();
    assert!(matches!(err, GarakError::RateLimit { .. }));
    assert_eq!(err.retry_after(), None);
}

#[tokio::test]
async fn missing_scan_maps_to_not_found() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/nope/status");
            then.status(404)
                .json_body(json!({ "error": "scan_not_found" }));
        })
        .await;

    let client = client_for(&server);
    let err = client.scans().status("nope", false).await.unwrap_err();

    assert!(matches!(err, GarakError::ScanNotFound { .. }), "{err:?}");
    assert!(err.message().contains("nope"));
    assert_eq!(err.status_code(), Some(404));
}

#[tokio::test]
async fn server_error_keeps_status_and_code() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1");
            then.status(500).json_body(json!({
                "error_code": "internal",
                "message": "database unavailable"
            }));
        })
        .await;

    let client = client_for(&server);
    let err = client.scans().get("S1").await.unwrap_err();

    match err {
        GarakError::Api {
            message,
            status_code,
            error_code,
            response,
        } => {
            assert_eq!(message, "database unavailable");
            assert_eq!(status_code, Some(500));
            assert_eq!(error_code.as_deref(), Some("internal"));
            assert!(response.unwrap().body.contains("database unavailable"));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn unexpected_body_shape_is_reported_with_raw_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/results");
            then.status(200).body("<html>maintenance</html>");
        })
        .await;

    let client = client_for(&server);
    let err = client.scans().results("S1").await.unwrap_err();

    assert!(matches!(err, GarakError::ScanValidation { .. }));
    let raw = err.response().unwrap();
    assert_eq!(raw.status, 200);
    assert_eq!(raw.body, "<html>maintenance</html>");
}

#[tokio::test]
async fn status_can_request_output_log() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/scans/S1/status")
                .query_param("include_output", "true");
            then.status(200).json_body(json!({
                "scan_id": "S1",
                "status": "running",
                "progress": { "completed_items": 4, "total_items": 8, "progress_percent": 50.0 },
                "output": "probe 4/8 done",
                "output_metadata": { "total_lines": 120, "start_line": 100, "returned_lines": 20 }
            }));
        })
        .await;

    let client = client_for(&server);
    let status = client.scans().status("S1", true).await.unwrap();

    mock.assert_async().await;
    assert_eq!(status.status, ScanStatus::Running);
    assert_eq!(status.progress.progress_percent, 50.0);
    assert_eq!(status.output.as_deref(), Some("probe 4/8 done"));
    assert_eq!(status.output_metadata.unwrap().returned_lines, 20);
}

#[tokio::test]
async fn list_passes_paging_and_filters() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/api/v1/scans")
                .query_param("page", "2")
                .query_param("per_page", "5")
                .query_param("status", "completed");
            then.status(200).json_body(json!({
                "scans": [scan_metadata("S1", "completed"), scan_metadata("S2", "completed")],
                "total": 7,
                "page": 2,
                "per_page": 5,
                "has_next": false
            }));
        })
        .await;

    let client = client_for(&server);
    let query = ListScansQuery {
        page: 2,
        per_page: 5,
        status: Some(ScanStatus::Completed),
        search: None,
    };
    let list = client.scans().list(&query).await.unwrap();

    mock.assert_async().await;
    assert_eq!(list.scans.len(), 2);
    assert_eq!(list.total, 7);
    assert!(!list.has_next);
}

#[tokio::test]
async fn update_and_cancel_round_trip() {
    let server = MockServer::start_async().await;
    let mut renamed = scan_metadata("S1", "running");
    renamed["name"] = json!("nightly");
    let update = server
        .mock_async(|when, then| {
            when.method(PATCH)
                .path("/api/v1/scans/S1")
                .json_body(json!({ "name": "nightly" }));
            then.status(200).json_body(json!({ "metadata": renamed }));
        })
        .await;
    let cancel = server
        .mock_async(|when, then| {
            when.method(DELETE).path("/api/v1/scans/S1");
            then.status(200).json_body(json!({
                "message": "Scan cancellation requested",
                "status": "cancelled"
            }));
        })
        .await;

    let client = client_for(&server);
    let scan = client
        .scans()
        .update(
            "S1",
            &UpdateScanRequest {
                name: Some("nightly".into()),
                description: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(scan.metadata.name.as_deref(), Some("nightly"));

    let response = client.scans().cancel("S1").await.unwrap();
    assert_eq!(response.status, "cancelled");

    update.assert_async().await;
    cancel.assert_async().await;
}

#[tokio::test]
async fn empty_update_is_rejected_locally() {
    let server = MockServer::start_async().await;
    let client = client_for(&server);
    let err = client
        .scans()
        .update("S1", &UpdateScanRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GarakError::ScanValidation { .. }));
}

#[tokio::test]
async fn quota_is_decoded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/quota");
            then.status(200).json_body(json!({
                "quota_status": {
                    "total_scans_used": 3,
                    "total_scans_limit": 10,
                    "remaining_total_scans": 7,
                    "can_use_paid_tier": true
                }
            }));
        })
        .await;

    let client = client_for(&server);
    let quota = client.scans().quota().await.unwrap();
    assert_eq!(quota.quota_status.remaining_total_scans, 7);
    assert!(quota.quota_status.can_use_paid_tier);
    assert!(!quota.quota_status.can_use_free_tier);
}

#[tokio::test]
async fn create_wait_and_fetch_results() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/scans");
            then.status(201).json_body(json!({
                "scan_id": "S1",
                "metadata": scan_metadata("S1", "pending")
            }));
        })
        .await;
    let status = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/status");
            then.status(200).json_body(status_body("S1", "completed"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1");
            then.status(200).json_body(json!({
                "metadata": scan_metadata("S1", "completed"),
                "reports": [
                    { "type": "json", "file_path": "/reports/S1.report.json", "file_size": 2048, "available": true }
                ]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/results");
            then.status(200).json_body(json!({
                "scan_id": "S1",
                "security_score": 85.5,
                "total_prompts": 100,
                "passed_prompts": 85,
                "failed_prompts": 15,
                "detector_summary": { "mitigation.MitigationBypass": { "passed": 40, "failed": 10 } }
            }));
        })
        .await;

    let client = client_for(&server);
    let created = client
        .scans()
        .create(&CreateScanRequest::new("openai", "gpt-4"))
        .await
        .unwrap();

    let mut calls = 0;
    let mut on_progress = |_: &ScanStatusResponse| -> garak_sdk::Result<()> {
        calls += 1;
        Ok(())
    };
    let finished = client
        .scans()
        .wait_for_completion(
            created.id(),
            WaitOptions::new(Duration::from_secs(30), Duration::from_millis(50)),
            Some(&mut on_progress),
        )
        .await
        .unwrap();
    assert_eq!(calls, 0);
    assert_eq!(finished.status(), ScanStatus::Completed);
    assert_eq!(finished.reports.len(), 1);
    status.assert_hits_async(1).await;

    let results = client.scans().results(finished.id()).await.unwrap();
    assert_eq!(results.scan_id, "S1");
    assert_eq!(results.security_score, Some(85.5));
    assert_eq!(
        results.detector_summary["mitigation.MitigationBypass"].failed,
        10
    );
}

#[tokio::test]
async fn wait_follows_status_transitions_over_http() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/api/v1/scans");
            then.status(201).json_body(json!({
                "scan_id": "S1",
                "metadata": scan_metadata("S1", "pending")
            }));
        })
        .await;
    let pending = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/status");
            then.status(200).json_body(status_body("S1", "pending"));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1");
            then.status(200)
                .json_body(json!({ "metadata": scan_metadata("S1", "completed") }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/results");
            then.status(200).json_body(json!({
                "scan_id": "S1",
                "security_score": 72.0,
                "total_prompts": 10,
                "passed_prompts": 7,
                "failed_prompts": 3
            }));
        })
        .await;

    let client = client_for(&server);
    let created = client
        .scans()
        .create(&CreateScanRequest::new("openai", "gpt-4"))
        .await
        .unwrap();
    assert_eq!(created.id(), "S1");

    let mut seen = Vec::new();
    let mut on_progress = |status: &ScanStatusResponse| -> garak_sdk::Result<()> {
        seen.push(status.status);
        Ok(())
    };
    let scans = client.scans();
    let wait = scans.wait_for_completion(
        "S1",
        WaitOptions::new(Duration::from_secs(30), Duration::from_millis(50)),
        Some(&mut on_progress),
    );
    // Each replacement mock is registered before the old one is removed so
    // that every poll finds a matching status.
    let transitions = async {
        tokio::time::sleep(Duration::from_millis(250)).await;
        let running = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/scans/S1/status");
                then.status(200).json_body(status_body("S1", "running"));
            })
            .await;
        pending.delete_async().await;
        tokio::time::sleep(Duration::from_millis(250)).await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/v1/scans/S1/status");
                then.status(200).json_body(status_body("S1", "completed"));
            })
            .await;
        running.delete_async().await;
    };
    let (finished, ()) = tokio::join!(wait, transitions);
    let finished = finished.unwrap();

    assert_eq!(finished.status(), ScanStatus::Completed);
    assert_eq!(seen.first(), Some(&ScanStatus::Pending));
    assert!(seen.contains(&ScanStatus::Running), "{seen:?}");
    assert!(!seen.contains(&ScanStatus::Completed));
    let first_running = seen.iter().position(|s| *s == ScanStatus::Running).unwrap();
    assert!(seen[first_running..].iter().all(|s| *s == ScanStatus::Running));

    let results = client.scans().results(finished.id()).await.unwrap();
    assert_eq!(results.scan_id, "S1");
    assert_eq!(results.security_score, Some(72.0));
}

#[tokio::test]
async fn wait_gives_up_on_a_scan_that_never_finishes() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1/status");
            then.status(200).json_body(status_body("S1", "running"));
        })
        .await;
    let fetch = server
        .mock_async(|when, then| {
            when.method(GET).path("/api/v1/scans/S1");
            then.status(200)
                .json_body(json!({ "metadata": scan_metadata("S1", "completed") }));
        })
        .await;

    let client = client_for(&server);
    let mut seen = Vec::new();
    let mut on_progress = |status: &ScanStatusResponse| -> garak_sdk::Result<()> {
        seen.push(status.progress.completed_items);
        Ok(())
    };
    let err = client
        .scans()
        .wait_for_completion(
            "S1",
            WaitOptions::new(Duration::from_millis(300), Duration::from_millis(100)),
            Some(&mut on_progress),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, GarakError::ScanTimeout { .. }), "{err:?}");
    assert!(!seen.is_empty());
    assert!(seen.iter().all(|items| *items == 3));
    assert_eq!(fetch.hits_async().await, 0);
}
