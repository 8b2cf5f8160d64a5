pub mod analytics;
pub mod api;
pub mod claim;
pub mod config;
pub mod features;
pub mod pipeline;
pub mod scoring;
pub mod store;
