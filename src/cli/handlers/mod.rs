// src/cli/handlers/mod.rs

// This module contains the logic for each CLI action.

pub mod commons;
pub mod list;
pub mod run;
