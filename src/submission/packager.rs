use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Turns a workspace into a single submission artifact.
pub trait Packager {
    /// `Ok(None)` when there is nothing to package.
    fn package(&self, workspace: &Path) -> io::Result<Option<PathBuf>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    /// Relative to the packaged directory, always with `/` separators.
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceBundle {
    pub root: String,
    pub files: Vec<SourceFile>,
}

/// Every regular file under `dir`, sorted by path. Non-UTF-8 content is
/// replaced lossily.
pub fn source_files(dir: &Path) -> io::Result<Vec<SourceFile>> {
    let mut files = Vec::new();
    walk(dir, dir, &mut files)?;
    files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(files)
}

fn walk(base: &Path, dir: &Path, out: &mut Vec<SourceFile>) -> io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let file_type = entry.file_type()?;
        if file_type.is_dir() {
            walk(base, &path, out)?;
        } else if file_type.is_file() {
            let bytes = fs::read(&path)?;
            let rel = path.strip_prefix(base).unwrap_or(&path);
            let rel = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            out.push(SourceFile {
                path: rel,
                content: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
    }
    Ok(())
}

/// Bundles `<workspace>/src` into `<artifact_dir>/submission.json`.
pub struct SourceBundler {
    artifact_dir: PathBuf,
    source_dir: String,
}

impl SourceBundler {
    pub const ARTIFACT_NAME: &'static str = "submission.json";

    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
            source_dir: "src".to_string(),
        }
    }
}

impl Packager for SourceBundler {
    fn package(&self, workspace: &Path) -> io::Result<Option<PathBuf>> {
        let source = workspace.join(&self.source_dir);
        if !source.is_dir() {
            debug!(path = %source.display(), "no source directory to package");
            return Ok(None);
        }

        let bundle = SourceBundle {
            root: self.source_dir.clone(),
            files: source_files(&source)?,
        };

        fs::create_dir_all(&self.artifact_dir)?;
        let artifact = self.artifact_dir.join(Self::ARTIFACT_NAME);
        let json = serde_json::to_vec_pretty(&bundle)?;
        fs::write(&artifact, json)?;

        info!(files = bundle.files.len(), path = %artifact.display(), "workspace packaged");
        Ok(Some(artifact))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("src/components")).unwrap();
        fs::write(dir.path().join("src/main.ts"), "console.log(1);").unwrap();
        fs::write(dir.path().join("src/components/App.tsx"), "export {}").unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        dir
    }

    #[test]
    fn bundles_only_src() {
        let ws = workspace();
        let out = TempDir::new().unwrap();
        let artifact = SourceBundler::new(out.path())
            .package(ws.path())
            .unwrap()
            .unwrap();

        assert_eq!(artifact, out.path().join("submission.json"));
        let bundle: SourceBundle =
            serde_json::from_slice(&fs::read(&artifact).unwrap()).unwrap();
        assert_eq!(bundle.root, "src");
        let paths: Vec<_> = bundle.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["components/App.tsx", "main.ts"]);
        assert_eq!(bundle.files[1].content, "console.log(1);");
    }

    #[test]
    fn missing_src_yields_none() {
        let ws = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        assert!(SourceBundler::new(out.path()).package(ws.path()).unwrap().is_none());
        assert!(!out.path().join("submission.json").exists());
    }

    #[test]
    fn non_utf8_content_is_kept_lossily() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("bin.dat"), [0x66, 0xff, 0x6f]).unwrap();
        let files = source_files(dir.path()).unwrap();
        assert_eq!(files[0].content, "f\u{fffd}o");
    }
}
