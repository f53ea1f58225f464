pub mod commands;
pub mod config;
pub mod ingest;
pub mod retention;
pub mod stats;
pub mod store;

/// Custom data passed to all commands
pub struct Data {
    pub config: config::Config,
    pub stores: store::Stores,
}

pub type Error = Box<dyn std::error::Error + Send + Sync>;
pub type Context<'a> = poise::Context<'a, Data, Error>;
