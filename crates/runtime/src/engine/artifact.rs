//! Temporary source files handed to the engine
//!
//! Files are named `<prefix>_<unix millis>_<random>.ergo` in the chosen temp
//! directory and removed when the artifact is dropped. Removal failures are
//! logged and swallowed.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::types::RequestError;

pub const SOURCE_EXTENSION: &str = ".ergo";

/// Which operation owns the file; only affects the name prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    InlineCode,
    SyntaxCheck,
}

impl ArtifactKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::InlineCode => "ergo_temp",
            Self::SyntaxCheck => "ergo_syntax",
        }
    }
}

/// A source file owned by one orchestrating operation.
#[derive(Debug)]
pub struct TemporaryArtifact {
    path: Option<TempPath>,
}

impl TemporaryArtifact {
    /// Write `contents` to a fresh file under `dir`.
    pub fn create_in(
        dir: &Path,
        kind: ArtifactKind,
        contents: &str,
    ) -> Result<Self, RequestError> {
        let prefix = format!(
            "{}_{}_",
            kind.prefix(),
            chrono::Utc::now().timestamp_millis()
        );

        let mut file = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(SOURCE_EXTENSION)
            .rand_bytes(10)
            .tempfile_in(dir)
            .map_err(|e| RequestError::Artifact(e.to_string()))?;

        file.write_all(contents.as_bytes())
            .and_then(|_| file.flush())
            .map_err(|e| RequestError::Artifact(e.to_string()))?;

        let path = file.into_temp_path();
        tracing::debug!("Wrote temporary source {}", path.display());
        Ok(Self { path: Some(path) })
    }

    pub fn path(&self) -> &Path {
        self.path
            .as_deref()
            .unwrap_or_else(|| Path::new(""))
    }

    /// The path as the engine should see it inside a quoted atom.
    pub fn path_text(&self) -> String {
        self.path().to_string_lossy().into_owned()
    }

    pub fn to_path_buf(&self) -> PathBuf {
        self.path().to_path_buf()
    }
}

impl Drop for TemporaryArtifact {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            let shown = path.display().to_string();
            if let Err(e) = path.close() {
                tracing::warn!("Failed to remove temporary source {}: {}", shown, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_naming_and_contents() {
        let dir = TempDir::new().unwrap();
        let artifact =
            TemporaryArtifact::create_in(dir.path(), ArtifactKind::InlineCode, "man(socrates).")
                .unwrap();

        let name = artifact
            .path()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("ergo_temp_"));
        assert!(name.ends_with(".ergo"));
        let middle = name
            .trim_start_matches("ergo_temp_")
            .trim_end_matches(".ergo");
        let (millis, token) = middle.split_once('_').unwrap();
        assert!(millis.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(token.len(), 10);

        assert_eq!(
            std::fs::read_to_string(artifact.path()).unwrap(),
            "man(socrates)."
        );
    }

    #[test]
    fn test_removed_on_drop() {
        let dir = TempDir::new().unwrap();
        let artifact =
            TemporaryArtifact::create_in(dir.path(), ArtifactKind::SyntaxCheck, "p(a).").unwrap();
        let path = artifact.to_path_buf();
        assert!(path.exists());
        assert!(artifact.path_text().contains("ergo_syntax_"));

        drop(artifact);
        assert!(!path.exists());
    }

    #[test]
    fn test_drop_tolerates_missing_file() {
        let dir = TempDir::new().unwrap();
        let artifact =
            TemporaryArtifact::create_in(dir.path(), ArtifactKind::InlineCode, "p(a).").unwrap();
        std::fs::remove_file(artifact.path()).unwrap();
        drop(artifact);
    }

    #[test]
    fn test_unwritable_directory() {
        let result = TemporaryArtifact::create_in(
            Path::new("/definitely/not/a/dir"),
            ArtifactKind::InlineCode,
            "p(a).",
        );
        assert!(matches!(result, Err(RequestError::Artifact(_))));
    }

    #[test]
    fn test_unique_names() {
        let dir = TempDir::new().unwrap();
        let a = TemporaryArtifact::create_in(dir.path(), ArtifactKind::InlineCode, "a.").unwrap();
        let b = TemporaryArtifact::create_in(dir.path(), ArtifactKind::InlineCode, "b.").unwrap();
        assert_ne!(a.path(), b.path());
    }
}
