// src/core/mod.rs

pub mod alias_resolver;
pub mod cache;
pub mod command_assembler;
pub mod commons;
pub mod config_store;
pub mod context_flags;
pub mod env_interceptor;
pub mod flag_expansion;
pub mod interpolator;
pub mod mutation;
pub mod reporter;
