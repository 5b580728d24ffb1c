//! Configuration file names and path helpers.

use std::path::{Path, PathBuf};

/// Hidden project/user directory name
pub const CORCH_DIR_NAME: &str = ".corch";

/// Configuration file name inside [`CORCH_DIR_NAME`]
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Project-root configuration file name
pub const PROJECT_CONFIG_FILE_NAME: &str = "corch.toml";

/// System-wide configuration file
pub const SYSTEM_CONFIG_FILE: &str = "/etc/corch/config.toml";

/// Default tracing filter for the binary
pub const DEFAULT_LOG_FILTER: &str = "corch=info";

/// `./corch.toml`
pub fn project_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(PROJECT_CONFIG_FILE_NAME)
}

/// `./.corch/config.toml`
pub fn local_config_file_path(current_dir: &Path) -> PathBuf {
    current_dir.join(CORCH_DIR_NAME).join(CONFIG_FILE_NAME)
}

/// `~/.corch/config.toml`
pub fn user_config_file_path(home_dir: &Path) -> PathBuf {
    home_dir.join(CORCH_DIR_NAME).join(CONFIG_FILE_NAME)
}
