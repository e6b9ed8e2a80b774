use std::path::{Path, PathBuf};

const APP_DIR: &str = "la1ere";

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/la1ere/
    // (avoid macOS Application Support folder for consistency)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(not(unix))]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn data_dir() -> PathBuf {
    // ~/.local/share/la1ere/ (XDG standard) on macOS and Linux too
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(not(unix))]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn default_config_file() -> PathBuf {
    config_dir().join("config.toml")
}

pub fn default_preferences_file() -> PathBuf {
    config_dir().join("preferences.toml")
}

/// `~/.outremer_radio.conf`, written by the original GTK player.
pub fn legacy_preferences_file() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".outremer_radio.conf"))
}

pub fn default_stations_file() -> PathBuf {
    config_dir().join("stations.toml")
}

pub fn log_file() -> PathBuf {
    data_dir().join("la1ere.log")
}

/// Platform spelling of an executable name (`vlc` → `vlc.exe` on Windows).
fn binary_names(name: &str) -> Vec<String> {
    #[cfg(windows)]
    {
        if name.ends_with(".exe") {
            vec![name.to_string()]
        } else {
            vec![format!("{}.exe", name), name.to_string()]
        }
    }
    #[cfg(not(windows))]
    {
        vec![name.to_string()]
    }
}

fn find_beside_exe(names: &[String]) -> Option<PathBuf> {
    let current_exe = std::env::current_exe().ok()?;
    let dir = current_exe.parent()?;
    for name in names {
        let p = dir.join(name);
        if p.is_file() {
            return Some(p);
        }
        let p = dir.join("external").join(name);
        if p.is_file() {
            return Some(p);
        }
    }
    None
}

fn find_on_path(names: &[String]) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    for dir in std::env::split_paths(&path) {
        for name in names {
            let p = dir.join(name);
            if p.is_file() {
                return Some(p);
            }
        }
    }
    None
}

/// Locate an external program (player or mixer).
///
/// Anything containing a path separator is taken as-is. Bare names are
/// searched beside the current executable (and its `external/` folder), then
/// on `PATH`. Returns `None` when nothing is found; callers fall back to the
/// bare name so the OS reports the failure at spawn time.
pub fn find_binary(name: &str) -> Option<PathBuf> {
    let as_path = Path::new(name);
    if as_path.components().count() > 1 {
        return as_path.is_file().then(|| as_path.to_path_buf());
    }

    let names = binary_names(name);
    find_beside_exe(&names).or_else(|| find_on_path(&names))
}

/// `find_binary`, or the bare name when the lookup fails.
pub fn resolve_binary(name: &str) -> PathBuf {
    find_binary(name).unwrap_or_else(|| PathBuf::from(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_preferences_in_home() {
        if let Some(path) = legacy_preferences_file() {
            assert!(path.ends_with(".outremer_radio.conf"));
            assert_eq!(path.parent(), dirs::home_dir().as_deref());
        }
    }

    #[test]
    fn test_default_paths_live_under_app_dir() {
        assert!(default_config_file().ends_with("la1ere/config.toml"));
        assert!(default_preferences_file().ends_with("la1ere/preferences.toml"));
        assert!(log_file().ends_with("la1ere/la1ere.log"));
    }

    #[test]
    fn test_unknown_binary_resolves_to_bare_name() {
        let name = "definitely-not-a-real-player-4f1c";
        assert!(find_binary(name).is_none());
        assert_eq!(resolve_binary(name), PathBuf::from(name));
    }

    #[cfg(unix)]
    #[test]
    fn test_sh_is_found_on_path() {
        let found = find_binary("sh").expect("sh should be on PATH");
        assert!(found.is_absolute());
    }
}
