pub mod app;
pub mod cache;
pub mod canonical;
pub mod checklist;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod matcher;
pub mod normalize;
pub mod output;
pub mod resolver;
pub mod stages;
pub mod store;
pub mod table;

#[cfg(test)]
mod fixtures;
