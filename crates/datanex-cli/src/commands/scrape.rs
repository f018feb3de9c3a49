use std::fs;

use crate::cli::{CrawlArgs, ScrapeMultiArgs, ScrapeUrlArgs, TablesArgs};
use crate::client::{AppContext, CliResult, read_error};
use crate::output::render_document;

pub(crate) async fn handle_scrape_url(ctx: &AppContext, args: ScrapeUrlArgs) -> CliResult<()> {
    let report = ctx
        .dashboard
        .scrape_single(&args.url, args.method)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}

pub(crate) async fn handle_scrape_multi(ctx: &AppContext, args: ScrapeMultiArgs) -> CliResult<()> {
    let mut urls = args.urls.join("\n");
    if let Some(path) = &args.from_file {
        let listed = fs::read_to_string(path).map_err(|err| read_error(path, &err))?;
        urls.push('\n');
        urls.push_str(&listed);
    }
    let report = ctx
        .dashboard
        .scrape_many(&urls, args.method, args.max_concurrent)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}

pub(crate) async fn handle_scrape_crawl(ctx: &AppContext, args: CrawlArgs) -> CliResult<()> {
    let report = ctx
        .dashboard
        .crawl(&args.start_url, args.max_depth, args.max_pages)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}

pub(crate) async fn handle_scrape_tables(ctx: &AppContext, args: TablesArgs) -> CliResult<()> {
    let report = ctx
        .dashboard
        .extract_tables(&args.url)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_document(&report, ctx.output)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::{Result, anyhow};
    use datanex_api_models::ScrapeMethod;
    use datanex_client::MemoryTokenStore;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::client::test_context;

    fn context(server: &MockServer) -> AppContext {
        test_context(server, Arc::new(MemoryTokenStore::with_token("tok")), true)
    }

    #[tokio::test]
    async fn multi_merges_arguments_and_url_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let list = dir.path().join("urls.txt");
        fs::write(&list, "https://b.example\n\n  https://c.example  \n")?;
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(POST).path("/scrape/multiple").json_body(json!({
                "urls": ["https://a.example", "https://b.example", "https://c.example"],
                "method": "playwright",
                "max_concurrent": 3
            }));
            then.status(200).json_body(json!({"results": []}));
        });
        let ctx = context(&server);

        handle_scrape_multi(
            &ctx,
            ScrapeMultiArgs {
                urls: vec!["https://a.example".to_string()],
                from_file: Some(list),
                method: ScrapeMethod::Playwright,
                max_concurrent: 3,
            },
        )
        .await?;

        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn empty_url_list_is_rejected_locally() -> Result<()> {
        let server = MockServer::start_async().await;
        let ctx = context(&server);

        let err = handle_scrape_multi(
            &ctx,
            ScrapeMultiArgs {
                urls: Vec::new(),
                from_file: None,
                method: ScrapeMethod::Requests,
                max_concurrent: 5,
            },
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("empty list should fail"))?;
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn crawl_depth_out_of_range_is_rejected_locally() -> Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/scrape/crawl");
            then.status(200).json_body(json!({"pages": []}));
        });
        let ctx = context(&server);

        let err = handle_scrape_crawl(
            &ctx,
            CrawlArgs {
                start_url: "https://example.com".to_string(),
                max_depth: 9,
                max_pages: 10,
            },
        )
        .await
        .err()
        .ok_or_else(|| anyhow!("depth 9 should fail"))?;
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn tables_and_single_scrape_render_reports() -> Result<()> {
        let server = MockServer::start_async().await;
        let tables = server.mock(|when, then| {
            when.method(POST)
                .path("/scrape/extract-tables")
                .query_param("url", "https://example.com/t");
            then.status(200).json_body(json!({"tables": [[1, 2]]}));
        });
        let single = server.mock(|when, then| {
            when.method(POST).path("/scrape/url").json_body(json!({
                "url": "https://example.com",
                "method": "requests"
            }));
            then.status(200).json_body(json!({"title": "Example"}));
        });
        let ctx = context(&server);

        handle_scrape_tables(
            &ctx,
            TablesArgs {
                url: "https://example.com/t".to_string(),
            },
        )
        .await?;
        handle_scrape_url(
            &ctx,
            ScrapeUrlArgs {
                url: "https://example.com".to_string(),
                method: ScrapeMethod::Requests,
            },
        )
        .await?;

        tables.assert();
        single.assert();
        Ok(())
    }
}
