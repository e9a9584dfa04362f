#![allow(clippy::collapsible_if)]

pub mod analysis;
pub mod cli;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod language;
pub mod logging;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod ty;

#[cfg(test)]
mod tests;
