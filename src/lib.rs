pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod registry;
pub mod routing;

#[cfg(test)]
pub(crate) mod testing;
