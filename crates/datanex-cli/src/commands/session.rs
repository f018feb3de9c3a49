use anyhow::Context;
use tracing::info;

use crate::cli::LoginArgs;
use crate::client::{AppContext, CliError, CliResult};

pub(crate) fn handle_login(ctx: &AppContext, args: LoginArgs) -> CliResult<()> {
    let token = args.token.trim();
    if token.is_empty() {
        return Err(CliError::validation("token must not be empty"));
    }
    ctx.tokens
        .save(token)
        .context("failed to store token")
        .map_err(CliError::failure)?;
    info!("bearer token stored");
    println!("logged in");
    Ok(())
}

pub(crate) fn handle_logout(ctx: &AppContext) -> CliResult<()> {
    ctx.tokens
        .clear()
        .context("failed to remove token")
        .map_err(CliError::failure)?;
    info!("bearer token cleared");
    println!("logged out");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use anyhow::Result;
    use datanex_client::{FileTokenStore, TokenStore};
    use httpmock::prelude::*;

    use super::*;
    use crate::client::test_context;

    #[tokio::test]
    async fn login_persists_token_used_by_later_requests() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = Arc::new(FileTokenStore::new(dir.path().join("nested").join("token")));
        let server = MockServer::start_async().await;
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/stats")
                .header("authorization", "Bearer tok-123");
            then.status(200).json_body(serde_json::json!({"total_files": 1}));
        });
        let ctx = test_context(&server, store.clone(), true);

        handle_login(
            &ctx,
            LoginArgs {
                token: "  tok-123\n".to_string(),
            },
        )?;
        assert_eq!(store.load().as_deref(), Some("tok-123"));

        let stats = ctx.client().get_stats().await?;
        assert_eq!(stats.total_files, 1);
        mock.assert();
        Ok(())
    }

    #[tokio::test]
    async fn blank_token_is_rejected() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let server = MockServer::start_async().await;
        let ctx = test_context(
            &server,
            Arc::new(FileTokenStore::new(dir.path().join("token"))),
            true,
        );
        let err = handle_login(
            &ctx,
            LoginArgs {
                token: "   ".to_string(),
            },
        )
        .err()
        .ok_or_else(|| anyhow::anyhow!("blank token should fail"))?;
        assert_eq!(err.exit_code(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn logout_removes_token_and_tolerates_repeat() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("token");
        let store = Arc::new(FileTokenStore::new(&path));
        store.save("tok")?;
        let server = MockServer::start_async().await;
        let ctx = test_context(&server, store.clone(), true);

        handle_logout(&ctx)?;
        assert!(store.load().is_none());
        assert!(!path.exists());
        handle_logout(&ctx)?;
        Ok(())
    }
}
