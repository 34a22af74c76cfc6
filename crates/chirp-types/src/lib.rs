pub mod api;
pub mod events;
pub mod kv;
pub mod models;
