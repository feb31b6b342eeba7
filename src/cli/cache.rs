// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Cache command - manage the download cache

use colored::Colorize;
use miette::Result;
use std::io::{self, Write};
use std::time::SystemTime;

use super::CacheAction;
use crate::cache::{Cache, CacheStats, FilesystemCache};
use crate::utils::{format_duration, print_header};

/// Run the cache command
pub async fn run(action: CacheAction, _verbose: bool) -> Result<()> {
    let working_dir = std::env::current_dir()
        .map_err(|e| miette::miette!("Failed to get current directory: {}", e))?;
    let cache = FilesystemCache::default_cache(&working_dir)?;
    let stats = cache.stats().await?;

    match action {
        CacheAction::Stats => {
            show_stats(&cache, &stats);
            Ok(())
        }
        CacheAction::Clear { yes } => clear(&cache, &stats, yes).await,
    }
}

fn show_stats(cache: &FilesystemCache, stats: &CacheStats) {
    print_header("Download Cache");
    println!("  Location: {}", cache.cache_dir().display());
    println!("  Entries:  {}", stats.entries);
    println!("  Size:     {}", stats.formatted_size());
    if let Some(age) = age_of(stats.oldest_entry) {
        println!("  Oldest:   {} ago", age);
    }
    if let Some(age) = age_of(stats.newest_entry) {
        println!("  Newest:   {} ago", age);
    }
}

async fn clear(cache: &FilesystemCache, stats: &CacheStats, yes: bool) -> Result<()> {
    if stats.entries == 0 {
        println!("{}", "Cache is already empty.".dimmed());
        return Ok(());
    }

    if !yes && !confirm(&format!(
        "Remove {} cached downloads ({})?",
        stats.entries,
        stats.formatted_size()
    )) {
        println!("{}", "Cancelled.".dimmed());
        return Ok(());
    }

    cache.clear().await?;
    println!(
        "{} Removed {} cached downloads.",
        "✓".green(),
        stats.entries
    );
    Ok(())
}

fn age_of(timestamp: Option<SystemTime>) -> Option<String> {
    timestamp
        .and_then(|t| t.elapsed().ok())
        .map(format_duration)
}

fn confirm(question: &str) -> bool {
    print!("{} [y/N] ", question);
    io::stdout().flush().ok();

    let mut input = String::new();
    io::stdin().read_line(&mut input).ok();
    input.trim().eq_ignore_ascii_case("y")
}
