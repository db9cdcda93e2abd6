pub mod auth;
pub mod error;
pub mod protocol;
pub mod state;
pub mod store;
pub mod ticker;
pub mod types;
pub mod ws;
