//! Locating the ErgoAI launcher
//!
//! Lookup order, first match wins: an explicit path that exists, the `PATH`,
//! the well-known install directories, then the installation root from
//! configuration or `ERGOAI_PATH`.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::config::{EngineConfig, INSTALL_ROOT_ENV};
use crate::types::ResolutionError;

/// File name of the launcher on this platform.
#[cfg(windows)]
pub const EXECUTABLE_NAME: &str = "runergo.bat";
#[cfg(not(windows))]
pub const EXECUTABLE_NAME: &str = "runergo";

/// Built-in install locations for the current platform.
pub fn well_known_paths(home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();

    #[cfg(windows)]
    {
        let tail = |vendor: &str| -> PathBuf {
            ["Coherent", vendor, "ErgoAI", EXECUTABLE_NAME].iter().collect()
        };
        if let Some(home) = home {
            paths.push(home.join(tail("ErgoAI")));
            paths.push(home.join(tail("ERGOAI")));
        }
        paths.push(Path::new("C:\\").join(tail("ErgoAI")));
        paths.push(Path::new("C:\\").join(tail("ERGOAI")));
        let program_files =
            std::env::var("PROGRAMFILES").unwrap_or_else(|_| "C:\\Program Files".to_string());
        paths.push(Path::new(&program_files).join(tail("ErgoAI")));
    }

    #[cfg(not(windows))]
    {
        let tail = |vendor: &str| -> PathBuf {
            ["Coherent", vendor, "ErgoAI", EXECUTABLE_NAME].iter().collect()
        };
        if let Some(home) = home {
            paths.push(home.join(tail("ERGOAI")));
            paths.push(home.join(tail("ErgoAI")));
        }
        for prefix in ["/opt", "/usr/local"] {
            paths.push(Path::new(prefix).join(tail("ERGOAI")));
            paths.push(Path::new(prefix).join(tail("ErgoAI")));
        }
    }

    paths
}

/// Resolves the engine launcher for each invocation.
#[derive(Debug, Clone)]
pub struct ExecutableResolver {
    explicit: Option<PathBuf>,
    candidates: Vec<PathBuf>,
    install_root: Option<PathBuf>,
    /// `None` searches the process `PATH`.
    search_path: Option<OsString>,
}

impl ExecutableResolver {
    pub fn new(
        explicit: Option<PathBuf>,
        candidates: Vec<PathBuf>,
        install_root: Option<PathBuf>,
    ) -> Self {
        Self {
            explicit,
            candidates,
            install_root,
            search_path: None,
        }
    }

    /// Resolver using the platform install paths plus the configured extras.
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut candidates = well_known_paths(dirs::home_dir().as_deref());
        candidates.extend(config.extra_search_paths.iter().cloned());
        Self::new(
            config.executable.clone(),
            candidates,
            config.install_root.clone(),
        )
    }

    /// Search these directories instead of the process `PATH`.
    pub fn with_search_path(mut self, search_path: impl Into<OsString>) -> Self {
        self.search_path = Some(search_path.into());
        self
    }

    pub fn candidates(&self) -> &[PathBuf] {
        &self.candidates
    }

    pub fn install_root(&self) -> Option<&Path> {
        self.install_root.as_deref()
    }

    /// Find a usable launcher, preferring `override_path` when it exists.
    ///
    /// A `PATH` hit returns the bare file name so the OS resolves it at spawn.
    pub fn resolve(&self, override_path: Option<&Path>) -> Result<PathBuf, ResolutionError> {
        for explicit in [override_path, self.explicit.as_deref()].into_iter().flatten() {
            if explicit.exists() {
                tracing::debug!("Using explicit ErgoAI executable {}", explicit.display());
                return Ok(explicit.to_path_buf());
            }
            tracing::debug!(
                "Explicit ErgoAI executable {} does not exist, continuing lookup",
                explicit.display()
            );
        }

        if self.on_search_path() {
            tracing::debug!("Found {} on PATH", EXECUTABLE_NAME);
            return Ok(PathBuf::from(EXECUTABLE_NAME));
        }

        if let Some(found) = self.candidates.iter().find(|p| p.exists()) {
            tracing::debug!("Found ErgoAI executable at {}", found.display());
            return Ok(found.clone());
        }

        if let Some(root) = &self.install_root {
            let executable = root.join(EXECUTABLE_NAME);
            if executable.exists() {
                tracing::debug!(
                    "Found ErgoAI executable under {} at {}",
                    INSTALL_ROOT_ENV,
                    executable.display()
                );
                return Ok(executable);
            }
        }

        Err(ResolutionError::NotFound {
            env_var: INSTALL_ROOT_ENV.to_string(),
            executable: EXECUTABLE_NAME.to_string(),
        })
    }

    fn on_search_path(&self) -> bool {
        match &self.search_path {
            Some(paths) => {
                let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                which::which_in(EXECUTABLE_NAME, Some(paths), cwd).is_ok()
            }
            None => which::which(EXECUTABLE_NAME).is_ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "#!/bin/sh\n").unwrap();
    }

    /// Resolver whose PATH search only sees an empty directory.
    fn isolated(
        scratch: &TempDir,
        explicit: Option<PathBuf>,
        candidates: Vec<PathBuf>,
        install_root: Option<PathBuf>,
    ) -> ExecutableResolver {
        let empty = scratch.path().join("empty-bin");
        std::fs::create_dir_all(&empty).unwrap();
        ExecutableResolver::new(explicit, candidates, install_root).with_search_path(empty)
    }

    #[test]
    fn test_explicit_path_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = dir.path().join("custom").join(EXECUTABLE_NAME);
        let candidate = dir.path().join("candidate").join(EXECUTABLE_NAME);
        touch(&explicit);
        touch(&candidate);

        let resolver = isolated(&dir, Some(explicit.clone()), vec![candidate], None);
        assert_eq!(resolver.resolve(None).unwrap(), explicit);
    }

    #[test]
    fn test_request_override_beats_configured_path() {
        let dir = TempDir::new().unwrap();
        let configured = dir.path().join("configured").join(EXECUTABLE_NAME);
        let requested = dir.path().join("requested").join(EXECUTABLE_NAME);
        touch(&configured);
        touch(&requested);

        let resolver = isolated(&dir, Some(configured), vec![], None);
        assert_eq!(resolver.resolve(Some(&requested)).unwrap(), requested);
    }

    #[test]
    fn test_missing_explicit_falls_through() {
        let dir = TempDir::new().unwrap();
        let candidate = dir.path().join("Coherent/ErgoAI/ErgoAI").join(EXECUTABLE_NAME);
        touch(&candidate);

        let resolver = isolated(
            &dir,
            Some(dir.path().join("nope").join(EXECUTABLE_NAME)),
            vec![dir.path().join("also-missing"), candidate.clone()],
            None,
        );
        assert_eq!(resolver.resolve(None).unwrap(), candidate);
    }

    #[test]
    fn test_install_root_is_last_resort() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("ErgoAI");
        touch(&root.join(EXECUTABLE_NAME));

        let resolver = isolated(&dir, None, vec![dir.path().join("missing")], Some(root.clone()));
        assert_eq!(resolver.resolve(None).unwrap(), root.join(EXECUTABLE_NAME));
    }

    #[test]
    fn test_not_found() {
        let dir = TempDir::new().unwrap();
        let resolver = isolated(
            &dir,
            None,
            vec![dir.path().join("missing")],
            Some(dir.path().join("no-root")),
        );
        let err = resolver.resolve(None).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::NotFound {
                env_var: "ERGOAI_PATH".into(),
                executable: EXECUTABLE_NAME.into(),
            }
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_search_path_returns_bare_name() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let bin = dir.path().join("bin");
        let launcher = bin.join(EXECUTABLE_NAME);
        touch(&launcher);
        std::fs::set_permissions(&launcher, std::fs::Permissions::from_mode(0o755)).unwrap();
        let candidate = dir.path().join("candidate").join(EXECUTABLE_NAME);
        touch(&candidate);

        let resolver =
            ExecutableResolver::new(None, vec![candidate], None).with_search_path(bin.as_os_str());
        assert_eq!(resolver.resolve(None).unwrap(), PathBuf::from(EXECUTABLE_NAME));
    }

    #[test]
    fn test_well_known_paths_cover_vendor_casing() {
        let home = PathBuf::from("/home/ergo");
        let paths = well_known_paths(Some(&home));
        assert!(paths.len() >= 5);
        assert!(paths.iter().all(|p| p.ends_with(EXECUTABLE_NAME)));
        assert!(paths.iter().any(|p| p.to_string_lossy().contains("ERGOAI")));
        assert!(paths.iter().any(|p| p.to_string_lossy().contains("Coherent/ErgoAI")
            || p.to_string_lossy().contains("Coherent\\ErgoAI")));
        assert!(paths[0].starts_with(&home));
    }

    #[test]
    fn test_from_config_appends_extra_paths() {
        let config = EngineConfig {
            extra_search_paths: vec![PathBuf::from("/srv/ergo/runergo")],
            ..Default::default()
        };
        let resolver = ExecutableResolver::from_config(&config);
        assert_eq!(
            resolver.candidates().last(),
            Some(&PathBuf::from("/srv/ergo/runergo"))
        );
    }
}
