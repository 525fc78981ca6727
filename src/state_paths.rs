//! Purpose: Resolve where session state lives on disk.
//! Exports: `default_state_dir`.
//! Role: Keep CLI and library defaults aligned from one source.
//! Invariants: Default state directory remains `~/.localpost`.

use std::path::PathBuf;

pub(crate) fn default_state_dir() -> PathBuf {
    let home = std::env::var_os("HOME").unwrap_or_default();
    PathBuf::from(home).join(".localpost")
}

#[cfg(test)]
mod tests {
    use super::default_state_dir;

    #[test]
    fn default_state_dir_is_hidden_home_subdir() {
        let dir = default_state_dir();
        assert_eq!(dir.file_name().and_then(|name| name.to_str()), Some(".localpost"));
    }
}
