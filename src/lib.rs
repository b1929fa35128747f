pub mod cli;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod vault;

pub use crypto::{generate_key, SymmetricKey};
pub use errors::{Result, VaultError};
pub use vault::{Encoding, Namespace, RecordStore, Value, Vault, VaultKey, VaultSet};
