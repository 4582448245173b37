//! Subcommand implementations

pub mod maintenance;
pub mod seed;
pub mod users;

use claritydash_store::{Storage, StoreConfig};
use std::path::Path;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

/// Open the store at `db`, applying settings from `config` if given
pub fn open_storage(db: &Path, config: Option<&Path>) -> CliResult<Storage> {
    let mut store_config = match config {
        Some(path) => StoreConfig::load(path)?,
        None => StoreConfig::default(),
    };
    store_config.path = Some(db.to_path_buf());

    Ok(Storage::open(&store_config)?)
}
