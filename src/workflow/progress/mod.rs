// SPDX-License-Identifier: MIT

//! Workflow progress markers
//!
//! This module provides:
//! - `classify` - per-state indicator for diagram nodes
//! - `generate_status_indicators` - marker rows for tabular progress
//! - `role_levels` - the role strip shown above the progress table

mod classifier;
mod markers;

pub use classifier::{classify, is_negative_state, Indicator, NEGATIVE_KEYWORDS};
pub use markers::{generate_status_indicators, role_levels, MarkerConfig, RoleLevel};
