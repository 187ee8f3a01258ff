//! Finding the GPS position embedded in a remote image or video without downloading it.
pub mod error;
pub mod fetch;
pub mod metadata;
pub mod patterns;
mod pipeline;
pub use fetch::{ByteFetcher, HttpByteFetcher, RequestHeaders};
pub use metadata::{ExiftoolReader, MetadataReader};
pub use pipeline::ExtractionPipeline;
