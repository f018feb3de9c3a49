use std::num::NonZeroU32;
use std::sync::Arc;

use anyhow::Result;
use datanex_api_models::{FileStatus, TaskState};
use datanex_client::{ApiError, FilePayload, TokenStore};
use datanex_dashboard::store::{NotificationLevel, UploadStatus};
use datanex_dashboard::{ActionError, Confirm, Dashboard, ValidationError};
use datanex_test_support::fixtures::{client_for, file_record_json, file_summary_json};
use datanex_test_support::mocks::AuthFakes;
use httpmock::prelude::*;
use serde_json::json;

const TX: &str = "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060";

fn dashboard(server: &MockServer, fakes: &AuthFakes, answer: bool) -> Result<Dashboard> {
    let confirm: Arc<dyn Confirm> = Arc::new(move |_: &str| answer);
    Ok(Dashboard::new(client_for(server, fakes)?, confirm))
}

fn last_message(dashboard: &Dashboard) -> Option<(NotificationLevel, String)> {
    dashboard
        .ui()
        .latest()
        .map(|notification| (notification.level, notification.message))
}

#[tokio::test]
async fn large_csv_upload_is_tracked_through_analysis() -> Result<()> {
    let server = MockServer::start_async().await;
    let upload = server.mock(|when, then| {
        when.method(POST).path("/upload/file");
        then.status(200).json_body(json!({
            "file_id": "f-big",
            "filename": "sales.csv",
            "size": 10_485_760,
            "status": "uploaded",
            "task_id": "t-ingest"
        }));
    });
    let analyze = server.mock(|when, then| {
        when.method(POST)
            .path("/analyze/full")
            .json_body(json!({"file_id": "f-big"}));
        then.status(200).json_body(json!({
            "message": "Analysis started",
            "file_id": "f-big",
            "task_id": "t-analysis"
        }));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    let mut receiver = dashboard.uploads().subscribe();
    let observer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while receiver.changed().await.is_ok() {
            let entry = receiver
                .borrow_and_update()
                .tasks
                .first()
                .map(|task| (task.status, task.progress));
            if let Some(entry) = entry {
                seen.push(entry);
                if entry.0 == UploadStatus::Success {
                    break;
                }
            }
        }
        seen
    });

    let payload = FilePayload::new("sales.csv", vec![b'7'; 10 * 1024 * 1024]);
    let file = dashboard.upload_and_analyze(payload).await?;
    let seen = observer.await?;

    upload.assert();
    analyze.assert();
    assert_eq!(file.file_id, "f-big");
    assert_eq!(file.status, FileStatus::Processing);
    assert_eq!(file.file_size, Some(10_485_760));

    assert!(seen.windows(2).all(|pair| pair[0].1 <= pair[1].1));
    assert!(
        seen.iter()
            .filter(|(status, _)| *status != UploadStatus::Uploading)
            .all(|(_, progress)| *progress == 100)
    );
    assert_eq!(seen.last(), Some(&(UploadStatus::Success, 100)));

    let files = dashboard.files().snapshot();
    assert_eq!(files.files.len(), 1);
    assert!(files.upload_progress.is_empty());
    let task = dashboard.tasks().get("t-analysis").expect("queued task");
    assert_eq!(task.state, TaskState::Pending);
    assert_eq!(task.file_id.as_deref(), Some("f-big"));
    assert_eq!(
        last_message(&dashboard),
        Some((
            NotificationLevel::Success,
            "sales.csv uploaded successfully!".to_string()
        ))
    );
    Ok(())
}

#[tokio::test]
async fn synchronous_analysis_completes_the_file() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/upload/file");
        then.status(200).json_body(json!({
            "file_id": "f-1",
            "filename": "small.json",
            "size": 3,
            "status": "uploaded"
        }));
    });
    server.mock(|when, then| {
        when.method(POST).path("/analyze/full");
        then.status(200)
            .json_body(json!({"quality_score": 91, "categories": ["ops"]}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    let file = dashboard
        .upload_and_analyze(FilePayload::new("small.json", b"{}\n".to_vec()))
        .await?;

    assert_eq!(file.status, FileStatus::Completed);
    assert_eq!(file.quality_score, Some(91));
    assert_eq!(file.categories, vec!["ops".to_string()]);
    assert!(dashboard.tasks().snapshot().tasks.is_empty());
    Ok(())
}

#[tokio::test]
async fn failed_upload_keeps_error_entry() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/upload/file");
        then.status(413).json_body(json!({"detail": "Payload too large"}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    let err = dashboard
        .upload_and_analyze(FilePayload::new("rows.csv", b"a,b\n".to_vec()))
        .await
        .expect_err("rejected upload");

    assert!(matches!(err, ActionError::Api { .. }));
    let uploads = dashboard.uploads().snapshot();
    assert_eq!(uploads.tasks.len(), 1);
    assert_eq!(uploads.tasks[0].status, UploadStatus::Error);
    assert_eq!(uploads.tasks[0].error.as_deref(), Some("Payload too large"));
    assert_eq!(
        last_message(&dashboard),
        Some((
            NotificationLevel::Error,
            "Failed to upload rows.csv".to_string()
        ))
    );
    assert!(dashboard.files().snapshot().files.is_empty());
    Ok(())
}

#[tokio::test]
async fn oversized_or_unsupported_files_never_upload() -> Result<()> {
    let server = MockServer::start_async().await;
    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    dashboard.settings().update(|draft| draft.max_file_size_mb = 1);
    dashboard.settings().save();

    let err = dashboard
        .upload_and_analyze(FilePayload::new("big.csv", vec![0; 2 * 1024 * 1024]))
        .await
        .expect_err("too large");
    assert!(matches!(
        err,
        ActionError::Validation(ValidationError::FileTooLarge { .. })
    ));

    let err = dashboard
        .upload_and_analyze(FilePayload::new("tool.exe", vec![1]))
        .await
        .expect_err("wrong type");
    assert!(err.is_validation());
    assert!(dashboard.uploads().snapshot().tasks.is_empty());
    Ok(())
}

#[tokio::test]
async fn malformed_transaction_hash_is_rejected_locally() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST).path("/blockchain/transaction");
        then.status(200).json_body(json!({"hash": "unexpected"}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    let err = dashboard
        .lookup_transaction("0x123")
        .await
        .expect_err("short hash");

    assert!(matches!(
        err,
        ActionError::Validation(ValidationError::InvalidTxHash { .. })
    ));
    assert_eq!(
        last_message(&dashboard),
        Some((
            NotificationLevel::Error,
            "Invalid transaction hash format".to_string()
        ))
    );
    Ok(())
}

#[tokio::test]
async fn valid_transaction_hash_reaches_the_service() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(POST)
            .path("/blockchain/transaction")
            .json_body(json!({"tx_hash": TX}));
        then.status(200).json_body(json!({"status": "confirmed"}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    let report = dashboard.lookup_transaction(TX).await?;

    mock.assert();
    assert_eq!(report["status"], json!("confirmed"));
    assert_eq!(
        last_message(&dashboard).map(|(_, message)| message),
        Some("Transaction retrieved successfully!".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn delete_without_confirmation_issues_no_request() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(DELETE).path("/upload/file/f-1");
        then.status(200).json_body(json!({"message": "deleted"}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, false)?;
    dashboard
        .files()
        .add_file(datanex_test_support::fixtures::remote_file("f-1", FileStatus::Completed));

    let err = dashboard.delete_file("f-1").await.expect_err("declined");
    assert!(matches!(err, ActionError::Declined));
    assert!(dashboard.files().get("f-1").is_some());
    assert!(dashboard.ui().latest().is_none());
    Ok(())
}

#[tokio::test]
async fn confirmed_delete_removes_the_file() -> Result<()> {
    let server = MockServer::start_async().await;
    let mock = server.mock(|when, then| {
        when.method(DELETE).path("/upload/file/f-1");
        then.status(200).json_body(json!({"message": "deleted"}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    dashboard.open_file_fixture("f-1");

    dashboard.delete_file("f-1").await?;
    mock.assert();
    let files = dashboard.files().snapshot();
    assert!(files.files.is_empty());
    assert!(files.selected.is_none());
    assert_eq!(
        last_message(&dashboard),
        Some((
            NotificationLevel::Success,
            "File deleted successfully".to_string()
        ))
    );
    Ok(())
}

trait FixtureExt {
    fn open_file_fixture(&self, file_id: &str);
}

impl FixtureExt for Dashboard {
    fn open_file_fixture(&self, file_id: &str) {
        let file = datanex_test_support::fixtures::remote_file(file_id, FileStatus::Completed);
        self.files().add_file(file.clone());
        self.files().select_file(Some(file));
    }
}

#[tokio::test]
async fn expired_session_surfaces_detail_and_redirects() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/upload/file/f-1");
        then.status(401).json_body(json!({"detail": "Not authenticated"}));
    });

    let fakes = AuthFakes::with_token("old");
    let dashboard = dashboard(&server, &fakes, true)?;
    let err = dashboard.open_file("f-1").await.expect_err("expired");

    assert!(err.api().is_some_and(ApiError::is_auth_expired));
    assert!(fakes.tokens.load().is_none());
    assert_eq!(fakes.redirect.count(), 1);
    assert_eq!(
        last_message(&dashboard),
        Some((NotificationLevel::Error, "Not authenticated".to_string()))
    );
    Ok(())
}

#[tokio::test]
async fn open_file_selects_the_fresh_record() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/upload/file/f-7");
        then.status(200).json_body(file_record_json("f-7", "ledger.csv"));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    let file = dashboard.open_file("f-7").await?;

    let files = dashboard.files().snapshot();
    assert_eq!(files.selected.as_ref(), Some(&file));
    assert_eq!(files.files.len(), 1);
    Ok(())
}

#[tokio::test]
async fn overview_loads_stats_and_recent_files() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/stats");
        then.status(200).json_body(json!({
            "total_files": 3,
            "total_analyses": 1,
            "total_tasks": 2,
            "service": "datanex",
            "version": "1.0.0"
        }));
    });
    let listing = server.mock(|when, then| {
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
                file_summary_json("b", "b.xml"),
                file_summary_json("c", "c.json")
            ]
        }));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    let overview = dashboard.load_dashboard().await?;

    listing.assert();
    assert_eq!(overview.stats.total_files, 3);
    assert_eq!(overview.recent_files.len(), 3);
    Ok(())
}

#[tokio::test]
async fn overview_failure_uses_page_message() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET).path("/stats");
        then.status(500);
    });
    server.mock(|when, then| {
        when.method(GET).path("/upload/files");
        then.status(200)
            .json_body(json!({"total": 0, "skip": 0, "limit": 5, "files": []}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    assert!(dashboard.load_dashboard().await.is_err());
    assert_eq!(
        last_message(&dashboard).map(|(_, message)| message),
        Some("Failed to load dashboard data".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn refresh_files_replaces_the_store() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(GET)
            .path("/upload/files")
            .query_param("skip", "10")
            .query_param("limit", "2");
        then.status(200).json_body(json!({
            "total": 12,
            "skip": 10,
            "limit": 2,
            "files": [file_summary_json("k", "k.csv"), file_summary_json("l", "l.csv")]
        }));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    dashboard.open_file_fixture("stale");
    let page = dashboard
        .refresh_files(10, NonZeroU32::new(2).expect("non-zero"))
        .await?;

    assert_eq!(page.total, 12);
    let ids: Vec<String> = dashboard
        .files()
        .snapshot()
        .files
        .into_iter()
        .map(|file| file.file_id)
        .collect();
    assert_eq!(ids, vec!["k".to_string(), "l".to_string()]);
    Ok(())
}

#[tokio::test]
async fn queued_jobs_are_polled_to_completion() -> Result<()> {
    let server = MockServer::start_async().await;
    server.mock(|when, then| {
        when.method(POST)
            .path("/analyze/clean")
            .json_body(json!({"file_id": "f-1", "strategy": "drop"}));
        then.status(200).json_body(json!({
            "message": "Data cleaning started",
            "file_id": "f-1",
            "strategy": "drop",
            "task_id": "t-clean"
        }));
    });
    server.mock(|when, then| {
        when.method(GET).path("/analyze/task/t-clean");
        then.status(200).json_body(json!({
            "state": "SUCCESS",
            "status": "done",
            "result": {"rows_removed": 4}
        }));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;
    dashboard.open_file_fixture("f-1");

    let outcome = dashboard
        .start_clean("f-1", datanex_api_models::CleanStrategy::default())
        .await?;
    assert_eq!(outcome.task_id(), Some("t-clean"));
    assert_eq!(
        dashboard.tasks().get("t-clean").map(|task| task.state),
        Some(TaskState::Pending)
    );
    assert_eq!(
        dashboard.files().get("f-1").map(|file| file.status),
        Some(FileStatus::Processing)
    );

    let task = dashboard.refresh_task("t-clean").await?;
    assert_eq!(task.state, TaskState::Success);
    assert_eq!(task.result, Some(json!({"rows_removed": 4})));
    assert_eq!(
        dashboard.files().get("f-1").map(|file| file.status),
        Some(FileStatus::Completed)
    );
    assert_eq!(
        last_message(&dashboard),
        Some((
            NotificationLevel::Success,
            "Task t-clean completed".to_string()
        ))
    );

    assert_eq!(dashboard.tasks().clear_completed_tasks(), 1);
    Ok(())
}

#[tokio::test]
async fn scraping_actions_validate_and_notify() -> Result<()> {
    let server = MockServer::start_async().await;
    let batch = server.mock(|when, then| {
        when.method(POST).path("/scrape/multiple").json_body(json!({
            "urls": ["https://a.example", "https://b.example"],
            "method": "requests",
            "max_concurrent": 5
        }));
        then.status(200).json_body(json!({"results": []}));
    });

    let fakes = AuthFakes::anonymous();
    let dashboard = dashboard(&server, &fakes, true)?;

    let err = dashboard
        .crawl("https://a.example", 9, 100)
        .await
        .expect_err("depth out of range");
    assert!(err.is_validation());

    let err = dashboard
        .scrape_single("   ", datanex_api_models::ScrapeMethod::default())
        .await
        .expect_err("blank url");
    assert!(err.is_validation());
    assert_eq!(
        last_message(&dashboard).map(|(_, message)| message),
        Some("Please enter a URL".to_string())
    );

    dashboard
        .scrape_many(
            "https://a.example\n\nhttps://b.example\n",
            datanex_api_models::ScrapeMethod::default(),
            5,
        )
        .await?;
    batch.assert();
    assert_eq!(
        last_message(&dashboard).map(|(_, message)| message),
        Some("Scraped 2 URLs successfully!".to_string())
    );
    Ok(())
}

#[tokio::test]
async fn settings_reset_needs_confirmation() -> Result<()> {
    let server = MockServer::start_async().await;
    let fakes = AuthFakes::anonymous();

    let declining = dashboard(&server, &fakes, false)?;
    declining
        .settings()
        .update(|draft| draft.theme = datanex_dashboard::store::Theme::Dark);
    declining.save_settings();
    assert_eq!(
        declining.ui().snapshot().theme,
        datanex_dashboard::store::Theme::Dark
    );
    assert!(matches!(
        declining.reset_settings(),
        Err(ActionError::Declined)
    ));
    assert_eq!(
        declining.settings().current().theme,
        datanex_dashboard::store::Theme::Dark
    );

    let accepting = dashboard(&server, &fakes, true)?;
    accepting.settings().update(|draft| draft.retention_days = 90);
    accepting.save_settings();
    accepting.reset_settings()?;
    assert_eq!(accepting.settings().current().retention_days, 30);
    assert_eq!(
        last_message(&accepting).map(|(_, message)| message),
        Some("Settings reset to defaults".to_string())
    );
    Ok(())
}
