pub mod client;
pub mod config;
pub mod error;
pub mod labels;
pub mod output;
pub mod queue;
pub mod store;
pub mod version;
pub mod view;
