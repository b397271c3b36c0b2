//! Well-known filesystem locations shared by the daemon and `launcherctl`

use std::path::PathBuf;

/// Directory name under the per-user runtime or cache directory
pub const APP_DIR: &str = "missile-launcher";

/// Socket file name
pub const SOCKET_NAME: &str = "launcherd.sock";

/// Default attribute socket path
///
/// Prefers `$XDG_RUNTIME_DIR`, then the user cache directory, then `/tmp`.
pub fn default_socket_path() -> PathBuf {
    dirs::runtime_dir()
        .or_else(dirs::cache_dir)
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_DIR)
        .join(SOCKET_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_socket_path_shape() {
        let path = default_socket_path();
        assert!(path.ends_with("missile-launcher/launcherd.sock"));
        assert!(path.is_absolute());
    }
}
