pub mod cli;
pub mod config;
mod db;
pub mod discovery;
pub mod error;
pub mod features;
pub mod imdb;
mod metrics;
pub mod pipeline;
mod server;
pub mod storage;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use db::ImageRecord;
pub use imdb::{IMDB, IMDBBuilder};
