// SPDX-License-Identifier: MIT

//! Workflow transition gating and progress rendering for Frappe doctypes

pub mod error;
pub mod render;
pub mod server;
pub mod source;
pub mod workflow;
