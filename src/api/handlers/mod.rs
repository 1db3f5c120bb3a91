//! API request handlers.

pub mod lanes;
pub mod metadata_services;
pub mod status;
pub mod sync;
