// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 feedflow contributors

//! Utility modules
//!
//! Terminal output helpers for the feedflow CLI.

pub mod output;
pub mod spinner;

pub use output::*;
pub use spinner::*;
