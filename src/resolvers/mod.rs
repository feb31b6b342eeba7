// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Record enrichment resolvers
//!
//! Resolvers run in the Prepare stage in the configured order. Each one is a
//! function of `(record, PrepareConfig)`: all settings come from the prepare
//! section, never from ambient state. A resolver decides for itself whether
//! it applies to a record and reports [`ResolveOutcome::Skipped`] otherwise.

mod category;
mod pricing;
mod title;
mod vin;

pub use category::{Category, CategoryConfig, CategoryResolver};
pub use pricing::{parse_price, PricingConfig, PricingResolver};
pub use title::{TitleConfig, TitleResolver};
pub use vin::{StockIdFromVinResolver, VinConfig, VinFromStockIdResolver};

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::{FeedflowError, FeedflowResult, RecordError};
use crate::record::Record;

/// Resolver identifiers
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResolverKind {
    Category,
    StockIdFromVin,
    VinFromStockId,
    Title,
    Pricing,
}

impl ResolverKind {
    pub fn parse(name: &str) -> FeedflowResult<Self> {
        name.parse()
            .map_err(|_| FeedflowError::unsupported("resolver", name, Self::iter()))
    }
}

/// Prepare section of a pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PrepareConfig {
    /// Resolvers to run, in order
    #[serde(default)]
    pub transformations: Vec<ResolverKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryConfig>,

    #[serde(default, skip_serializing_if = "VinConfig::is_default")]
    pub vin: VinConfig,

    #[serde(default, skip_serializing_if = "TitleConfig::is_default")]
    pub title: TitleConfig,

    #[serde(default, skip_serializing_if = "PricingConfig::is_default")]
    pub pricing: PricingConfig,
}

impl PrepareConfig {
    pub fn with_transformations(transformations: impl IntoIterator<Item = ResolverKind>) -> Self {
        Self {
            transformations: transformations.into_iter().collect(),
            ..Default::default()
        }
    }
}

/// What a resolver did with a record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveOutcome {
    Applied,
    Skipped,
}

/// A named record enrichment
pub trait Resolver: Send + Sync {
    /// Enrich `record` in place
    ///
    /// An `Err` is logged by the Prepare stage; the record is kept and the
    /// remaining resolvers still run.
    fn resolve(
        &self,
        record: &mut Record,
        config: &PrepareConfig,
    ) -> Result<ResolveOutcome, RecordError>;
}

/// Registry mapping resolver identifiers to implementations
pub struct ResolverRegistry {
    resolvers: HashMap<ResolverKind, Box<dyn Resolver>>,
}

impl ResolverRegistry {
    pub fn new() -> Self {
        Self {
            resolvers: HashMap::new(),
        }
    }

    /// Create a registry with every built-in resolver
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(ResolverKind::Category, Box::new(CategoryResolver));
        registry.register(ResolverKind::StockIdFromVin, Box::new(StockIdFromVinResolver));
        registry.register(ResolverKind::VinFromStockId, Box::new(VinFromStockIdResolver));
        registry.register(ResolverKind::Title, Box::new(TitleResolver));
        registry.register(ResolverKind::Pricing, Box::new(PricingResolver));
        registry
    }

    pub fn register(&mut self, kind: ResolverKind, resolver: Box<dyn Resolver>) {
        self.resolvers.insert(kind, resolver);
    }

    pub fn get(&self, kind: ResolverKind) -> FeedflowResult<&dyn Resolver> {
        self.resolvers.get(&kind).map(|r| r.as_ref()).ok_or_else(|| {
            let registered: Vec<String> = ResolverKind::iter()
                .filter(|k| self.resolvers.contains_key(k))
                .map(|k| k.to_string())
                .collect();
            FeedflowError::unsupported("resolver", kind.as_ref(), registered)
        })
    }
}

impl Default for ResolverRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Whether a record already has a non-empty value at `field`
pub(crate) fn has_value(record: &Record, field: &str) -> bool {
    crate::extract::extract(record, field).is_some_and(|v| !crate::record::is_empty_value(&v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolver_kind() {
        assert_eq!(
            ResolverKind::parse("stock_id_from_vin").unwrap(),
            ResolverKind::StockIdFromVin
        );
        let err = ResolverKind::parse("geocode").unwrap_err();
        assert!(matches!(err, FeedflowError::UnsupportedType { .. }));
    }

    #[test]
    fn test_default_registry_has_all_kinds() {
        let registry = ResolverRegistry::with_defaults();
        for kind in ResolverKind::iter() {
            assert!(registry.get(kind).is_ok());
        }
        assert!(ResolverRegistry::new().get(ResolverKind::Title).is_err());
    }

    #[test]
    fn test_prepare_config_yaml() {
        let yaml = "transformations:\n- title\n- pricing\npricing:\n  fields:\n  - price\n  - sale_price\n";
        let config: PrepareConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config.transformations,
            vec![ResolverKind::Title, ResolverKind::Pricing]
        );
        assert_eq!(config.pricing.fields, vec!["price", "sale_price"]);
        assert_eq!(config.title, TitleConfig::default());
    }
}
