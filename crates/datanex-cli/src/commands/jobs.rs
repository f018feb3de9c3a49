use std::time::Duration;

use anyhow::anyhow;
use datanex_api_models::TaskState;
use tokio::time::sleep;
use tracing::debug;

use crate::cli::{CleanArgs, DedupArgs, FileIdArgs, OutputFormat, TaskStatusArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_job, render_task};

pub(crate) async fn handle_analyze_full(ctx: &AppContext, args: FileIdArgs) -> CliResult<()> {
    let outcome = ctx
        .dashboard
        .start_analysis(&args.file_id)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_job(&outcome, ctx.output)
}

pub(crate) async fn handle_analyze_clean(ctx: &AppContext, args: CleanArgs) -> CliResult<()> {
    let outcome = ctx
        .dashboard
        .start_clean(&args.file_id, args.strategy)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_job(&outcome, ctx.output)
}

pub(crate) async fn handle_analyze_dedup(ctx: &AppContext, args: DedupArgs) -> CliResult<()> {
    let outcome = ctx
        .dashboard
        .start_deduplicate(&args.file_id, args.method, args.keep)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_job(&outcome, ctx.output)
}

/// Report a task once, or poll it every `interval` seconds until it finishes
/// when `--wait` is given. A waited task that ends in `FAILURE` exits non-zero.
pub(crate) async fn handle_task_status(ctx: &AppContext, args: TaskStatusArgs) -> CliResult<()> {
    let interval = Duration::from_secs(args.interval);
    loop {
        let task = ctx
            .dashboard
            .refresh_task(&args.task_id)
            .await
            .map_err(|err| ctx.action_error(err))?;
        if !args.wait || task.is_terminal() {
            render_task(&task, ctx.output)?;
            if args.wait && task.state == TaskState::Failure {
                return Err(CliError::failure(anyhow!("task {} failed", task.task_id)));
            }
            return Ok(());
        }
        debug!(task_id = %task.task_id, state = %task.state, "task still running");
        if ctx.output == OutputFormat::Table {
            let progress = task
                .progress
                .map_or_else(String::new, |value| format!(" {value:.0}%"));
            eprintln!("{}{progress}", task.state);
        }
        sleep(interval).await;
    }
}
