pub mod cache;
pub mod encoder;
pub mod fetcher;
pub mod inflight;
pub mod resize_service;
pub mod resolver;
pub mod transform;
