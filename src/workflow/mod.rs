// SPDX-License-Identifier: MIT

pub mod condition;
pub mod diagram;
pub mod document;
pub mod history;
pub mod loader;
pub mod progress;
pub mod reminder;
pub mod transitions;
pub mod types;
