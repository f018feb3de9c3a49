use anyhow::anyhow;
use datanex_api_models::FileListResponse;

use crate::cli::OutputFormat;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_file_list, render_health, render_json, render_stats};

/// Service counters plus the most recent uploads.
pub(crate) async fn handle_stats(ctx: &AppContext) -> CliResult<()> {
    let overview = ctx
        .dashboard
        .load_dashboard()
        .await
        .map_err(|err| ctx.action_error(err))?;
    match ctx.output {
        OutputFormat::Json => render_json(&overview),
        OutputFormat::Table => {
            render_stats(&overview.stats, OutputFormat::Table)?;
            println!();
            let recent = FileListResponse {
                total: overview.stats.total_files,
                skip: 0,
                limit: u32::try_from(overview.recent_files.len()).unwrap_or(u32::MAX),
                files: overview.recent_files,
            };
            render_file_list(&recent, OutputFormat::Table)
        }
    }
}

/// Liveness probe; an unhealthy answer is printed and exits non-zero.
pub(crate) async fn handle_health(ctx: &AppContext) -> CliResult<()> {
    let health = ctx
        .client()
        .health_check()
        .await
        .map_err(|err| CliError::from_api(err, "Health check failed"))?;
    render_health(&health, ctx.output)?;
    if health.is_healthy() {
        Ok(())
    } else {
        let reason = health.error.unwrap_or(health.status);
        Err(CliError::failure(anyhow!("service unhealthy: {reason}")))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use datanex_client::MemoryTokenStore;
    use datanex_test_support::fixtures::file_summary_json;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::client::test_context;

    fn context(server: &MockServer) -> AppContext {
        test_context(server, Arc::new(MemoryTokenStore::with_token("tok")), true)
    }

    #[tokio::test]
    async fn stats_loads_counters_and_recent_files() -> Result<()> {
        let server = MockServer::start_async().await;
        let stats = server.mock(|when, then| {
            when.method(GET).path("/stats");
            then.status(200)
                .json_body(json!({"total_files": 7, "total_analyses": 3, "total_tasks": 2}));
        });
        let recent = server.mock(|when, then| {
            when.method(GET)
                .path("/upload/files")
                .query_param("skip", "0")
                .query_param("limit", "5");
            then.status(200).json_body(json!({
                "total": 1,
                "skip": 0,
                "limit": 5,
                "files": [file_summary_json("f-1", "a.csv")]
            }));
        });
        let ctx = context(&server);

        handle_stats(&ctx).await?;

        stats.assert();
        recent.assert();
        Ok(())
    }

    #[tokio::test]
    async fn healthy_service_succeeds() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(200)
                .json_body(json!({"status": "healthy", "database": "connected"}));
        });
        let ctx = context(&server);

        handle_health(&ctx).await?;
        Ok(())
    }

    #[tokio::test]
    async fn unhealthy_service_exits_non_zero() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(GET).path("/health");
            then.status(503)
                .json_body(json!({"status": "unhealthy", "error": "database offline"}));
        });
        let ctx = context(&server);

        let err = handle_health(&ctx)
            .await
            .err()
            .ok_or_else(|| anyhow!("unhealthy service should fail"))?;
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("database offline"));
        Ok(())
    }
}
