//! Configuration loaded from `.shardvault.toml`.

pub mod settings;

pub use settings::Settings;
