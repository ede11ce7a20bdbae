pub mod processor;

pub use processor::{extract_artifact, UpdateProcessor};
