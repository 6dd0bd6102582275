pub mod codec;
pub mod error;
pub mod fields;
pub mod handlers;
pub mod models;
pub mod path;
pub mod ports;
pub mod query;
pub mod resolver;
pub mod secret_serde;
pub mod state;
pub mod store;
pub mod transfer;
