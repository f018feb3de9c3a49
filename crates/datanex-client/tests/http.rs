use std::num::NonZeroU32;

use anyhow::Result;
use datanex_api_models::{CleanStrategy, DedupMethod, FileStatus, JobOutcome, KeepPolicy, TaskState};
use datanex_client::{ApiError, FilePayload, TokenStore, UploadEvent};
use datanex_test_support::fixtures::{client_for, file_record_json, file_summary_json};
use datanex_test_support::mocks::AuthFakes;
use httpmock::prelude::*;
use serde_json::json;

fn limit(value: u32) -> NonZeroU32 {
    NonZeroU32::new(value).expect("non-zero limit")
}

#[tokio::test]
async fn bearer_token_is_attached_when_present() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/stats")
            .header("authorization", "Bearer secret-token");
        then.status(200).json_body(json!({
            "total_files": 4,
            "total_analyses": 2,
            "total_tasks": 9
        }));
    });

    let fakes = AuthFakes::with_token("secret-token");
    let stats = client_for(&server, &fakes)?.get_stats().await?;

    mock.assert();
    assert_eq!(stats.total_files, 4);
    assert_eq!(stats.total_tasks, 9);
    Ok(())
}

#[tokio::test]
async fn json_bodies_carry_json_content_type() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/analyze/clean")
            .header("content-type", "application/json")
            .json_body(json!({"file_id": "f-1", "strategy": "fill"}));
        then.status(200).json_body(json!({
            "message": "Data cleaning started",
            "file_id": "f-1",
            "strategy": "fill",
            "task_id": "t-1"
        }));
    });

    let fakes = AuthFakes::anonymous();
    let outcome = client_for(&server, &fakes)?
        .clean_data("f-1", CleanStrategy::Fill)
        .await?;

    mock.assert();
    assert_eq!(outcome.task_id(), Some("t-1"));
    Ok(())
}

#[tokio::test]
async fn unauthorized_clears_token_and_redirects() -> Result<()> {
    let server = MockServer::start_async().await;
    let rejected = server.mock(|when, then| {
        when.method(GET)
            .path("/upload/file/f-1")
            .header("authorization", "Bearer stale");
        then.status(401)
            .json_body(json!({"detail": "Token expired"}));
    });

    let fakes = AuthFakes::with_token("stale");
    let client = client_for(&server, &fakes)?;
    let err = client
        .get_file_info("f-1")
        .await
        .expect_err("401 rejects the call");

    rejected.assert();
    assert!(err.is_auth_expired());
    assert_eq!(err.detail(), Some("Token expired"));
    assert!(fakes.tokens.load().is_none());
    assert_eq!(fakes.redirect.count(), 1);

    // The cleared token is no longer sent, so the header-matching mock misses.
    let follow_up = client.get_file_info("f-1").await.expect_err("unmatched");
    assert!(matches!(follow_up, ApiError::NotFound { .. }));
    Ok(())
}

#[tokio::test]
async fn unauthorized_fires_for_any_operation() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/blockchain/block");
        then.status(401);
    });
    server.mock(|when, then| {
        when.method(GET).path("/blockchain/gas-prices");
        then.status(401);
    });

    let fakes = AuthFakes::with_token("t");
    let client = client_for(&server, &fakes)?;
    assert!(client.get_block(17).await.expect_err("401").is_auth_expired());
    fakes.tokens.save("t2")?;
    assert!(
        client
            .get_gas_prices()
            .await
            .expect_err("401")
            .is_auth_expired()
    );
    assert_eq!(fakes.redirect.count(), 2);
    assert!(!fakes.has_token());
    Ok(())
}

#[tokio::test]
async fn server_detail_is_preserved() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/analyze/deduplicate");
        then.status(400).json_body(json!({"detail": "Invalid method"}));
    });
    server.mock(|when, then| {
        when.method(DELETE).path("/upload/file/gone");
        then.status(404).json_body(json!({"detail": "File not found"}));
    });
    server.mock(|when, then| {
        when.method(GET).path("/stats");
        then.status(500).body("internal error");
    });

    let fakes = AuthFakes::anonymous();
    let client = client_for(&server, &fakes)?;

    let rejected = client
        .deduplicate_data("f-1", DedupMethod::Exact, KeepPolicy::Last)
        .await
        .expect_err("400");
    assert_eq!(rejected.status(), Some(400));
    assert_eq!(rejected.user_message("Deduplication failed"), "Invalid method");

    let missing = client.delete_file("gone").await.expect_err("404");
    assert!(matches!(missing, ApiError::NotFound { .. }));
    assert_eq!(missing.detail(), Some("File not found"));

    let opaque = client.get_stats().await.expect_err("500");
    assert_eq!(opaque.status(), Some(500));
    assert_eq!(opaque.user_message("Failed to load stats"), "Failed to load stats");
    assert_eq!(fakes.redirect.count(), 0);
    Ok(())
}

#[tokio::test]
async fn file_listing_sends_pagination_and_returns_short_pages() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(GET)
            .path("/upload/files")
            .query_param("skip", "0")
            .query_param("limit", "5");
        then.status(200).json_body(json!({
            "total": 3,
            "skip": 0,
            "limit": 5,
            "files": [
                file_summary_json("a", "a.csv"),
                file_summary_json("b", "b.csv"),
                file_summary_json("c", "c.csv")
            ]
        }));
    });

    let fakes = AuthFakes::anonymous();
    let page = client_for(&server, &fakes)?.get_files(0, limit(5)).await?;

    mock.assert();
    assert_eq!(page.files.len(), 3);
    assert_eq!(page.files[2].file_id, "c");
    Ok(())
}

#[tokio::test]
async fn file_info_decodes_full_record() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/upload/file/f-9");
        then.status(200).json_body(file_record_json("f-9", "orders.csv"));
    });

    let fakes = AuthFakes::anonymous();
    let file = client_for(&server, &fakes)?.get_file_info("f-9").await?;
    assert_eq!(file.filename, "orders.csv");
    assert_eq!(file.status, FileStatus::Completed);
    assert_eq!(file.analysis().map(|a| a.quality_score), Some(92));
    Ok(())
}

#[tokio::test]
async fn upload_reports_progress_then_receipt() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST).path("/upload/file");
        then.status(200).json_body(json!({
            "file_id": "f-10",
            "filename": "big.csv",
            "size": 300_000,
            "status": "uploaded",
            "task_id": "t-10"
        }));
    });

    let fakes = AuthFakes::anonymous();
    let client = client_for(&server, &fakes)?;
    let mut stream = client.upload_file(FilePayload::new("big.csv", vec![b'x'; 300_000]));

    let mut progress = Vec::new();
    let mut receipt = None;
    while let Some(event) = stream.next_event().await {
        match event {
            UploadEvent::Progress(percent) => progress.push(percent),
            UploadEvent::Finished(outcome) => receipt = Some(outcome?),
        }
    }

    mock.assert();
    assert_eq!(progress.first(), Some(&0));
    assert_eq!(progress.last(), Some(&100));
    assert!(progress.windows(2).all(|pair| pair[0] < pair[1]));
    let receipt = receipt.expect("terminal event");
    assert_eq!(receipt.file_id, "f-10");
    assert_eq!(receipt.task_id.as_deref(), Some("t-10"));
    Ok(())
}

#[tokio::test]
async fn upload_failure_surfaces_detail() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/upload/file");
        then.status(400).json_body(json!({"detail": "File type not allowed"}));
    });

    let fakes = AuthFakes::anonymous();
    let err = client_for(&server, &fakes)?
        .upload_file(FilePayload::new("x.exe", vec![1, 2, 3]))
        .finish()
        .await
        .expect_err("rejected");
    assert_eq!(err.detail(), Some("File type not allowed"));
    Ok(())
}

#[tokio::test]
async fn task_status_and_job_outcomes_decode() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/analyze/task/t-1");
        then.status(200).json_body(json!({
            "state": "PROGRESS",
            "current": "dedupe",
            "progress": 40,
            "status": "working"
        }));
    });
    server.mock(|when, then| {
        when.method(POST)
            .path("/analyze/full")
            .json_body(json!({"file_id": "f-1"}));
        then.status(200)
            .json_body(json!({"status": "completed", "quality_score": 77}));
    });

    let fakes = AuthFakes::anonymous();
    let client = client_for(&server, &fakes)?;
    let status = client.get_task_status("t-1").await?;
    assert_eq!(status.state, TaskState::Progress);
    assert_eq!(status.progress, Some(40.0));

    let outcome = client.analyze_file("f-1").await?;
    assert!(matches!(outcome, JobOutcome::Completed(_)));
    Ok(())
}

#[tokio::test]
async fn scrape_and_chain_payloads_pass_through() -> Result<()> {
    let server = MockServer::start_async().await;
    let tables = server.mock(|when, then| {
        when.method(POST)
            .path("/scrape/extract-tables")
            .query_param("url", "https://example.com/t");
        then.status(200).json_body(json!({"tables": [[1, 2]]}));
    });
    let crawl = server.mock(|when, then| {
        when.method(POST).path("/scrape/crawl").json_body(json!({
            "start_url": "https://example.com",
            "max_depth": 2,
            "max_pages": 100
        }));
        then.status(200).json_body(json!({"pages": 12}));
    });
    let tx = server.mock(|when, then| {
        when.method(POST)
            .path("/blockchain/transaction")
            .json_body(json!({"tx_hash": "0xabc"}));
        then.status(200).json_body(json!({"transaction": {"value": "1"}}));
    });

    let fakes = AuthFakes::anonymous();
    let client = client_for(&server, &fakes)?;
    assert_eq!(
        client.extract_tables("https://example.com/t").await?,
        json!({"tables": [[1, 2]]})
    );
    assert_eq!(
        client.crawl_website("https://example.com", 2, 100).await?["pages"],
        json!(12)
    );
    assert_eq!(
        client.get_transaction("0xabc").await?["transaction"]["value"],
        json!("1")
    );
    tables.assert();
    crawl.assert();
    tx.assert();
    Ok(())
}

#[tokio::test]
async fn health_check_reads_unhealthy_body() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/health");
        then.status(503)
            .json_body(json!({"status": "unhealthy", "error": "db down"}));
    });

    let fakes = AuthFakes::anonymous();
    let health = client_for(&server, &fakes)?.health_check().await?;
    assert!(!health.is_healthy());
    assert_eq!(health.error.as_deref(), Some("db down"));
    Ok(())
}
