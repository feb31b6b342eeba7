// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Pipeline stages and their fixed order

use serde::{Deserialize, Serialize};
use std::fmt;
use strum::{AsRefStr, EnumIter, EnumString, IntoEnumIterator};

use crate::errors::{FeedflowError, FeedflowResult};

/// One step of the import chain
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    EnumIter,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Stage {
    Download,
    Read,
    Filter,
    Map,
    #[strum(to_string = "images_prepare", serialize = "images-prepare")]
    ImagesPrepare,
    Prepare,
    Save,
}

impl Stage {
    /// Position in the chain, starting at 1
    pub fn order(self) -> u8 {
        match self {
            Stage::Download => 1,
            Stage::Read => 2,
            Stage::Filter => 3,
            Stage::Map => 4,
            Stage::ImagesPrepare => 5,
            Stage::Prepare => 6,
            Stage::Save => 7,
        }
    }

    /// Name used in messages and stage-failure errors
    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Download => "Download",
            Stage::Read => "Read",
            Stage::Filter => "Filter",
            Stage::Map => "Map",
            Stage::ImagesPrepare => "ImagesPrepare",
            Stage::Prepare => "Prepare",
            Stage::Save => "Save",
        }
    }

    pub fn parse(name: &str) -> FeedflowResult<Self> {
        name.parse()
            .map_err(|_| FeedflowError::unsupported("stage", name, Self::iter()))
    }

    /// Whether running up to `self` has reached `target`
    pub fn reached(self, target: Stage) -> bool {
        self.order() >= target.order()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}
