pub mod analyzer;
pub mod api;
pub mod config;
pub mod data_models;
pub mod error;
pub mod extractor;
pub mod llm;
pub mod logging;
pub mod pipeline;
pub mod retry;
pub mod scrapper;
pub mod search;
pub mod store;
