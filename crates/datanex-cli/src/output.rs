use anyhow::anyhow;
use datanex_api_models::{
    Document, FileListResponse, GasPrices, HealthStatus, JobOutcome, RemoteFile, ServiceStats,
};
use datanex_dashboard::store::BackgroundTask;
use serde::Serialize;
use serde_json::Value;

use crate::cli::OutputFormat;
use crate::client::{CliError, CliResult};

const UNAVAILABLE: &str = "N/A";

pub(crate) fn render_json<T: Serialize>(value: &T) -> CliResult<()> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::failure(anyhow!("failed to format JSON: {err}")))?;
    println!("{text}");
    Ok(())
}

pub(crate) fn render_file_list(list: &FileListResponse, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(list),
        OutputFormat::Table => {
            println!(
                "{:<26} {:<8} {:<11} {:>10} {:<20} NAME",
                "ID", "TYPE", "STATUS", "SIZE", "CREATED"
            );
            for file in &list.files {
                println!(
                    "{:<26} {:<8} {:<11} {:>10} {:<20} {}",
                    file.file_id,
                    file.file_type.as_str(),
                    file.status.as_str(),
                    file.file_size.map_or_else(|| UNAVAILABLE.to_string(), format_bytes),
                    format_created(file),
                    file.filename
                );
            }
            println!(
                "showing {} of {} (skip {})",
                list.files.len(),
                list.total,
                list.skip
            );
            Ok(())
        }
    }
}

pub(crate) fn render_file_detail(file: &RemoteFile, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(file),
        OutputFormat::Table => {
            println!("id: {}", file.file_id);
            println!("name: {}", file.filename);
            println!("type: {}", file.file_type.as_str());
            println!("status: {}", file.status.as_str());
            if let Some(size) = file.file_size {
                println!("size: {}", format_bytes(size));
            }
            println!("created: {}", format_created(file));
            if let (Some(rows), Some(columns)) = (file.row_count, file.column_count) {
                println!("shape: {rows} rows x {columns} columns");
            }
            if let Some(summary) = file.analysis() {
                println!("quality: {}/100", summary.quality_score);
                if !summary.categories.is_empty() {
                    println!("categories: {}", summary.categories.join(", "));
                }
            }
            if !file.tags.is_empty() {
                println!("tags: {}", file.tags.join(", "));
            }
            Ok(())
        }
    }
}

pub(crate) fn render_job(outcome: &JobOutcome, format: OutputFormat) -> CliResult<()> {
    match (outcome, format) {
        (_, OutputFormat::Json) => render_json(outcome),
        (JobOutcome::Queued(ticket), OutputFormat::Table) => {
            println!("task queued: {}", ticket.task_id);
            if let Some(message) = &ticket.message {
                println!("message: {message}");
            }
            Ok(())
        }
        (JobOutcome::Completed(document), OutputFormat::Table) => {
            render_document(document, OutputFormat::Table)
        }
    }
}

pub(crate) fn render_task(task: &BackgroundTask, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(task),
        OutputFormat::Table => {
            println!("task: {}", task.task_id);
            println!("state: {}", task.state);
            if let Some(status) = &task.status {
                println!("status: {status}");
            }
            if let Some(current) = &task.current {
                println!("step: {current}");
            }
            if let Some(progress) = task.progress {
                println!("progress: {progress:.0}%");
            }
            if let Some(result) = &task.result {
                println!("result:");
                render_document(result, OutputFormat::Table)?;
            }
            Ok(())
        }
    }
}

/// Opaque service reports: top-level fields one per line, nested values as
/// compact JSON.
pub(crate) fn render_document(document: &Document, format: OutputFormat) -> CliResult<()> {
    match (document, format) {
        (_, OutputFormat::Json) => render_json(document),
        (Value::Object(fields), OutputFormat::Table) => {
            for (key, value) in fields {
                println!("{key}: {}", format_value(value));
            }
            Ok(())
        }
        (other, OutputFormat::Table) => {
            println!("{}", format_value(other));
            Ok(())
        }
    }
}

pub(crate) fn render_gas(prices: &GasPrices, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(prices),
        OutputFormat::Table => {
            println!("low: {}", format_gwei(prices.low));
            println!("medium: {}", format_gwei(prices.medium));
            println!("high: {}", format_gwei(prices.high));
            Ok(())
        }
    }
}

pub(crate) fn render_stats(stats: &ServiceStats, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(stats),
        OutputFormat::Table => {
            if let Some(service) = &stats.service {
                println!(
                    "service: {service} {}",
                    stats.version.as_deref().unwrap_or_default()
                );
            }
            println!("files: {}", stats.total_files);
            println!("analyses: {}", stats.total_analyses);
            println!("tasks: {}", stats.total_tasks);
            Ok(())
        }
    }
}

pub(crate) fn render_health(health: &HealthStatus, format: OutputFormat) -> CliResult<()> {
    match format {
        OutputFormat::Json => render_json(health),
        OutputFormat::Table => {
            println!("status: {}", health.status);
            if let Some(database) = &health.database {
                println!("database: {database}");
            }
            if let Some(error) = &health.error {
                println!("error: {error}");
            }
            Ok(())
        }
    }
}

#[must_use]
pub(crate) fn format_gwei(value: Option<f64>) -> String {
    value.map_or_else(|| UNAVAILABLE.to_string(), |gwei| format!("{gwei} Gwei"))
}

fn format_created(file: &RemoteFile) -> String {
    file.created_at.map_or_else(
        || UNAVAILABLE.to_string(),
        |created| created.format("%Y-%m-%d %H:%M").to_string(),
    )
}

fn format_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => UNAVAILABLE.to_string(),
        other => other.to_string(),
    }
}

#[must_use]
pub(crate) fn format_bytes(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    const MIB: f64 = KIB * 1024.0;
    const GIB: f64 = MIB * 1024.0;
    let value = bytes_to_f64(bytes);
    if value >= GIB {
        format!("{:.2} GiB", value / GIB)
    } else if value >= MIB {
        format!("{:.2} MiB", value / MIB)
    } else if value >= KIB {
        format!("{:.2} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}

fn bytes_to_f64(value: u64) -> f64 {
    let high = u32::try_from(value >> 32).unwrap_or(u32::MAX);
    let low = u32::try_from(value & 0xFFFF_FFFF).unwrap_or(u32::MAX);
    f64::from(high) * 4_294_967_296.0 + f64::from(low)
}
