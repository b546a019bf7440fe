pub mod app;
pub mod cli;
pub mod config;
pub mod loader;
pub mod output;
pub mod reconciler;
pub mod session;
pub mod utils;

#[cfg(test)]
mod tests;
