use std::io::{self, IsTerminal};
use std::num::NonZeroU32;

use datanex_client::FilePayload;
use datanex_dashboard::store::{UploadStatus, UploadTask};
use serde_json::json;
use tokio::task::JoinHandle;

use crate::cli::{FileDeleteArgs, FileIdArgs, FilesListArgs, OutputFormat, UploadArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{render_file_detail, render_file_list, render_json};

pub(crate) async fn handle_upload(ctx: &AppContext, args: UploadArgs) -> CliResult<()> {
    let payload = FilePayload::from_path(&args.path).await.map_err(|err| {
        CliError::from_api(err, &format!("failed to read {}", args.path.display()))
    })?;
    if args.no_analyze {
        let settings = ctx.dashboard.settings();
        settings.update(|draft| draft.auto_analyze = false);
        settings.save();
    }

    let progress = show_progress(ctx);
    let uploaded = ctx.dashboard.upload_and_analyze(payload).await;
    if let Some(handle) = progress {
        handle.abort();
        eprintln!();
    }
    let file = uploaded.map_err(|err| ctx.action_error(err))?;

    if ctx.output == OutputFormat::Table {
        let tasks = ctx.dashboard.tasks().snapshot();
        if let Some(task) = tasks
            .active()
            .find(|task| task.file_id.as_deref() == Some(file.file_id.as_str()))
        {
            println!("analysis task: {}", task.task_id);
        }
    }
    render_file_detail(&file, ctx.output)
}

pub(crate) async fn handle_files_list(ctx: &AppContext, args: FilesListArgs) -> CliResult<()> {
    let limit =
        NonZeroU32::new(args.limit).ok_or_else(|| CliError::validation("limit must be positive"))?;
    let page = ctx
        .dashboard
        .refresh_files(args.skip, limit)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_file_list(&page, ctx.output)
}

pub(crate) async fn handle_files_show(ctx: &AppContext, args: FileIdArgs) -> CliResult<()> {
    let file = ctx
        .dashboard
        .open_file(&args.file_id)
        .await
        .map_err(|err| ctx.action_error(err))?;
    render_file_detail(&file, ctx.output)
}

pub(crate) async fn handle_files_delete(ctx: &AppContext, args: FileDeleteArgs) -> CliResult<()> {
    ctx.dashboard
        .delete_file(&args.file_id)
        .await
        .map_err(|err| ctx.action_error(err))?;
    if ctx.output == OutputFormat::Json {
        render_json(&json!({ "file_id": args.file_id, "deleted": true }))?;
    }
    Ok(())
}

/// Mirror the upload store on an interactive stderr.
fn show_progress(ctx: &AppContext) -> Option<JoinHandle<()>> {
    if ctx.output != OutputFormat::Table || !io::stderr().is_terminal() {
        return None;
    }
    let mut updates = ctx.dashboard.uploads().subscribe();
    Some(tokio::spawn(async move {
        let mut shown = None;
        while updates.changed().await.is_ok() {
            let latest = updates.borrow_and_update().tasks.last().cloned();
            let Some(task) = latest else {
                continue;
            };
            let line = progress_line(&task);
            if shown.as_ref() != Some(&line) {
                eprint!("\r{line}");
                shown = Some(line);
            }
        }
    }))
}

fn progress_line(task: &UploadTask) -> String {
    let label = match task.status {
        UploadStatus::Uploading => "uploading",
        UploadStatus::Analyzing => "analyzing",
        UploadStatus::Success => "done",
        UploadStatus::Error => "failed",
    };
    format!("{} {:>3}% {label}", task.filename, task.progress)
}
