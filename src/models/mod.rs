//! Core data models for the image resizing proxy.
//!
//! These types describe a single resize request as it flows through the
//! pipeline: the validated request itself, where its source lives, and which
//! formats are decoded from the store and encoded for the response.

pub mod format;
pub mod request;
pub mod source;
