pub mod config;
pub mod discovery;
pub mod guard;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;
pub mod ticket;
pub mod utils;
