// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Terminal output helpers
//!
//! Consistent symbols and colours across the CLI commands.

use colored::Colorize;
use std::time::Duration;

/// Print a styled header
pub fn print_header(title: &str) {
    println!("{}", title.bold());
    println!("{}", "═".repeat(title.chars().count().max(40)));
}

/// Print a styled section
pub fn print_section(title: &str) {
    println!();
    println!("{}:", title.bold());
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "✗".red(), msg);
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Compact human readable duration (`850ms`, `12.3s`, `4m`, `2h`, `3d`)
pub fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let secs = duration.as_secs();

    if millis < 1000 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

/// Signed byte delta, e.g. `+1.50 MB` / `-512 bytes`
pub fn format_delta(bytes: i64) -> String {
    let sign = if bytes < 0 { "-" } else { "+" };
    format!("{sign}{}", crate::cache::format_bytes(bytes.unsigned_abs()))
}
