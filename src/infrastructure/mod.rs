//! Infrastructure layer - concrete parsers, chunkers, providers, search,
//! stores, caches, and composed services

pub mod cache;
pub mod chunkers;
pub mod completion;
pub mod embedding;
pub mod http_client;
pub mod parsers;
pub mod search;
pub mod services;
pub mod store;

pub use http_client::{HttpClient, HttpClientTrait};
