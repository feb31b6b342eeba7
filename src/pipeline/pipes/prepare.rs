// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Prepare stage
//!
//! Resolvers are best effort: a failing resolver is recorded for that row,
//! the remaining resolvers still run, and the record is kept.

use async_trait::async_trait;
use std::sync::Arc;

use super::{warn_rows, Pipe};
use crate::errors::{FeedflowResult, RowError};
use crate::pipeline::{PipelineState, PrepareResult, ResolverStats, Stage};
use crate::resolvers::{ResolveOutcome, Resolver, ResolverKind, ResolverRegistry};

pub struct PreparePipe {
    resolvers: Arc<ResolverRegistry>,
}

impl PreparePipe {
    pub fn new(resolvers: Arc<ResolverRegistry>) -> Self {
        Self { resolvers }
    }
}

#[async_trait]
impl Pipe for PreparePipe {
    fn stage(&self) -> Stage {
        Stage::Prepare
    }

    async fn process(&self, state: &mut PipelineState) -> FeedflowResult<()> {
        let config = Arc::clone(&state.config);
        let resolvers = match config.prepare.as_ref() {
            Some(prepare) => prepare
                .transformations
                .iter()
                .map(|kind| Ok((*kind, self.resolvers.get(*kind)?)))
                .collect::<FeedflowResult<Vec<(ResolverKind, &dyn Resolver)>>>()?,
            None => Vec::new(),
        };

        // Mapped records move into the prepare result unless intermediates are kept
        let mapping = state
            .results
            .mapping
            .as_mut()
            .ok_or_else(|| PipelineState::missing(Stage::Prepare, Stage::Map))?;
        let mut records = if config.options.release_intermediate {
            std::mem::take(&mut mapping.records)
        } else {
            mapping.records.clone()
        };
        let total = records.len();

        let Some(prepare) = config.prepare.as_ref() else {
            state.results.prepare = Some(PrepareResult {
                records,
                total,
                prepared: 0,
                skipped: total,
                resolver_stats: Vec::new(),
                errors: Vec::new(),
            });
            return Ok(());
        };
        tracing::debug!(resolvers = ?prepare.transformations, "resolvers selected");

        let warn = warn_rows(state);
        let mut stats: Vec<ResolverStats> = resolvers.iter().map(|(kind, _)| ResolverStats::new(*kind)).collect();
        let mut errors = Vec::new();
        let mut prepared = 0;

        for (index, record) in records.iter_mut().enumerate() {
            let mut changed = false;
            for ((kind, resolver), stat) in resolvers.iter().zip(stats.iter_mut()) {
                match resolver.resolve(record, prepare) {
                    Ok(ResolveOutcome::Applied) => {
                        stat.applied += 1;
                        changed = true;
                    }
                    Ok(ResolveOutcome::Skipped) => stat.skipped += 1,
                    Err(e) => {
                        stat.failed += 1;
                        if warn {
                            tracing::warn!(row = index, resolver = %kind, error = %e, "resolver failed, record kept");
                        }
                        errors.push(RowError::new(index, e.to_string()));
                    }
                }
            }
            if changed {
                prepared += 1;
            }
        }

        state.results.prepare = Some(PrepareResult {
            records,
            total,
            prepared,
            skipped: total - prepared,
            resolver_stats: stats,
            errors,
        });
        Ok(())
    }
}
