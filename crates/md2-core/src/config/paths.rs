//! Standard locations for md2 files

use std::path::PathBuf;

const APP_DIR: &str = "md2";
const CONFIG_FILE: &str = "md2.yaml";

/// Per-user config directory: `<config dir>/md2`
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// `<config dir>/md2/md2.yaml`
pub fn default_config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}

/// Default clip library: the user's audio directory, else `~/Music`
pub fn default_library_path() -> PathBuf {
    dirs::audio_dir().unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("Music")
    })
}
