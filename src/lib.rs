pub mod analytics;
pub mod config;
pub mod dashboard;
pub mod db;
pub mod error;
pub mod fallback;
pub mod http;
pub mod logging;
pub mod providers;
pub mod token_store;

#[cfg(test)]
pub(crate) mod test_support;
