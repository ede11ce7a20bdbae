pub mod client;
pub mod transfer;

pub use client::Downloader;
pub use transfer::{TransferProgress, TransferSnapshot};
