pub mod client;
pub mod error;
pub mod fetcher;
pub mod mapper;
pub mod models;
pub mod params;

pub use crate::fetcher::NulpFetcher;
pub use crate::params::{SourceDescriptor, SourceRequest, SourceSettings};
