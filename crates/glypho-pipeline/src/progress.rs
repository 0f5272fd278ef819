//! Progress indicators for downloads and per-species loops

use indicatif::{ProgressBar, ProgressStyle};

const DOWNLOAD_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {bytes}/{total_bytes} ({eta})";

const STEP_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

fn styled(total: u64, template: &str, message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new(total);
    let style = ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// Byte-counting bar for a single file download
pub fn download_bar(size: u64, message: &str, visible: bool) -> ProgressBar {
    styled(size, DOWNLOAD_TEMPLATE, message, visible)
}

/// Item-counting bar, e.g. one step per species directory
pub fn step_bar(total: u64, message: &str, visible: bool) -> ProgressBar {
    styled(total, STEP_TEMPLATE, message, visible)
}

/// Format bytes into human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit_idx = 0;

    while size >= 1024.0 && unit_idx < UNITS.len() - 1 {
        size /= 1024.0;
        unit_idx += 1;
    }

    if unit_idx == 0 {
        format!("{} {}", size as u64, UNITS[unit_idx])
    } else {
        format!("{:.2} {}", size, UNITS[unit_idx])
    }
}
