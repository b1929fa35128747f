//! One module per CLI subcommand.

pub mod delete;
pub mod get;
pub mod init;
pub mod keygen;
pub mod keys;
pub mod list;
pub mod set;
