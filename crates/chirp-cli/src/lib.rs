pub mod client;
pub mod display;

pub use client::ChirpClient;
