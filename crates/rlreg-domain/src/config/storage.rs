use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for the server's document store (one JSON file per
    /// collection) or, when used by the client's filesystem backend, the
    /// root of the content-addressed resource tree.
    #[serde(default = "d_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: d_data_dir(),
        }
    }
}

fn d_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
