pub mod api;
pub mod cache;
pub mod classifier;
pub mod config;
pub mod db;
pub mod debounce;
pub mod domain;
pub mod engine;
pub mod guard;
pub mod host;
pub mod init;
pub mod logger;
pub mod search;
pub mod stats;
pub mod store;
pub mod verdict;
