mod client;
mod types;

pub use client::{FoxessClient, DEFAULT_BASE_URL};
