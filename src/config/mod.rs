use std::env;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::apply_security_headers;

const DEFAULT_PORT: u16 = 3001;

pub struct Config {
    pub port: u16,
    /// Load a handful of sample events at startup for local development.
    pub demo_seed: bool,
}

impl Config {
    pub fn from_env() -> Self {
        let port = env::var("SPOTT_PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let demo_seed = env::var("SPOTT_DEMO_SEED")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);

        Self { port, demo_seed }
    }
}
