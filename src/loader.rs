//! Config document loading.
//!
//! The walker never touches the disk itself. It goes through two seams:
//!
//! - [`Fs`] answers existence checks, reads bytes and expands glob patterns.
//!   [`OsFs`] is the real filesystem; [`MemoryFs`] keeps files in memory for
//!   tests and embedding.
//! - [`Loader`] turns paths and patterns into parsed documents.
//!   [`FsLoader`] picks the format from the file extension (`json`, `yaml` or
//!   `yml`, `toml`) and requires the top level to be a map.
//!
//! Glob matches are loaded in sorted path order so list fields filled from a
//! pattern are deterministic.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::RigfileError;

pub trait Fs {
    fn exists(&self, path: &Path) -> bool;

    fn read(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Paths matching `pattern`, in no particular order.
    fn glob(&self, pattern: &str) -> io::Result<Vec<PathBuf>>;
}

/// The real filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFs;

impl Fs for OsFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        std::fs::read(path)
    }

    fn glob(&self, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let paths = glob::glob(pattern).map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        paths.map(|entry| entry.map_err(io::Error::from)).collect()
    }
}

/// An in-memory filesystem. A directory exists when some stored file lives
/// beneath it.
#[derive(Debug, Clone, Default)]
pub struct MemoryFs {
    files: BTreeMap<PathBuf, Vec<u8>>,
}

impl MemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        self.files.insert(path.into(), contents.into());
    }
}

impl Fs for MemoryFs {
    fn exists(&self, path: &Path) -> bool {
        self.files.keys().any(|file| file.starts_with(path))
    }

    fn read(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )
        })
    }

    fn glob(&self, pattern: &str) -> io::Result<Vec<PathBuf>> {
        let pattern = glob::Pattern::new(pattern)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let options = glob::MatchOptions {
            case_sensitive: true,
            require_literal_separator: true,
            require_literal_leading_dot: false,
        };
        Ok(self
            .files
            .keys()
            .filter(|path| pattern.matches_path_with(path, options))
            .cloned()
            .collect())
    }
}

/// A parsed document and where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedConfig {
    path: PathBuf,
    data: Map<String, Value>,
}

impl LoadedConfig {
    pub fn new(path: impl Into<PathBuf>, data: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            data,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// File stem, used as the key when documents fill a map.
    pub fn name(&self) -> String {
        self.path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub trait Loader {
    fn load_config(&self, path: &Path) -> Result<LoadedConfig, RigfileError>;

    fn load_configs(&self, paths: &[PathBuf]) -> Result<Vec<LoadedConfig>, RigfileError> {
        paths.iter().map(|path| self.load_config(path)).collect()
    }

    /// Load every document matching `pattern`. Relative patterns are taken
    /// from `cwd`.
    fn glob_configs(&self, pattern: &str, cwd: &Path) -> Result<Vec<LoadedConfig>, RigfileError>;
}

/// Loads documents through an [`Fs`].
pub struct FsLoader<'a> {
    fs: &'a dyn Fs,
}

impl<'a> FsLoader<'a> {
    pub fn new(fs: &'a dyn Fs) -> Self {
        Self { fs }
    }
}

impl Loader for FsLoader<'_> {
    fn load_config(&self, path: &Path) -> Result<LoadedConfig, RigfileError> {
        debug!(path = %path.display(), "loading config");
        let fail = |reason: String| RigfileError::Load {
            path: path.to_path_buf(),
            reason,
        };
        let format = Format::from_path(path).ok_or_else(|| {
            fail("unsupported extension, expected json, yaml, yml or toml".to_string())
        })?;
        let bytes = self.fs.read(path).map_err(|e| fail(e.to_string()))?;
        let text = std::str::from_utf8(&bytes).map_err(|e| fail(e.to_string()))?;
        let value = format.parse(text).map_err(fail)?;
        match value {
            Value::Object(data) => Ok(LoadedConfig::new(path, data)),
            Value::Null => Ok(LoadedConfig::new(path, Map::new())),
            other => Err(fail(format!(
                "top level must be a map, got {}",
                crate::walker::value_kind(&other)
            ))),
        }
    }

    fn glob_configs(&self, pattern: &str, cwd: &Path) -> Result<Vec<LoadedConfig>, RigfileError> {
        let full = if Path::new(pattern).is_absolute() {
            PathBuf::from(pattern)
        } else {
            cwd.join(pattern)
        };
        let mut paths = self.fs.glob(&full.to_string_lossy()).map_err(|e| RigfileError::Load {
            path: full.clone(),
            reason: e.to_string(),
        })?;
        paths.sort();
        debug!(pattern = %full.display(), matched = paths.len(), "expanded config glob");
        self.load_configs(&paths)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(Format::Json),
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            _ => None,
        }
    }

    fn parse(self, text: &str) -> Result<Value, String> {
        match self {
            Format::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
            Format::Yaml if is_blank_yaml(text) => Ok(Value::Null),
            Format::Yaml => serde_yaml::from_str(text).map_err(|e| e.to_string()),
            Format::Toml => toml::from_str(text).map_err(|e: toml::de::Error| e.to_string()),
        }
    }
}

/// Only whitespace and comments.
fn is_blank_yaml(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn formats_by_extension() {
        let fs = MemoryFs::new()
            .with_file("/r/a.json", r#"{"name": "json"}"#)
            .with_file("/r/b.yaml", "name: yaml\n")
            .with_file("/r/c.yml", "name: yml\n")
            .with_file("/r/d.toml", "name = \"toml\"\n");
        let loader = FsLoader::new(&fs);
        for (path, name) in [
            ("/r/a.json", "json"),
            ("/r/b.yaml", "yaml"),
            ("/r/c.yml", "yml"),
            ("/r/d.toml", "toml"),
        ] {
            let doc = loader.load_config(Path::new(path)).unwrap();
            assert_eq!(doc.data()["name"], name);
        }
    }

    #[test]
    fn unknown_extension_fails() {
        let fs = MemoryFs::new().with_file("/r/a.ini", "x=1");
        let err = FsLoader::new(&fs)
            .load_config(Path::new("/r/a.ini"))
            .unwrap_err();
        assert!(err.to_string().contains("loading config `/r/a.ini` failed"));
    }

    #[test]
    fn missing_file_fails() {
        let fs = MemoryFs::new();
        let err = FsLoader::new(&fs)
            .load_config(Path::new("/r/none.yaml"))
            .unwrap_err();
        assert!(matches!(err, RigfileError::Load { .. }));
    }

    #[test]
    fn top_level_must_be_a_map() {
        let fs = MemoryFs::new().with_file("/r/list.yaml", "- a\n- b\n");
        let err = FsLoader::new(&fs)
            .load_config(Path::new("/r/list.yaml"))
            .unwrap_err();
        assert!(err.to_string().contains("top level must be a map, got array"));
    }

    #[test]
    fn empty_yaml_is_an_empty_map() {
        let fs = MemoryFs::new().with_file("/r/empty.yaml", "# nothing yet\n");
        let doc = FsLoader::new(&fs)
            .load_config(Path::new("/r/empty.yaml"))
            .unwrap();
        assert!(doc.data().is_empty());
    }

    #[test]
    fn syntax_error_names_the_file() {
        let fs = MemoryFs::new().with_file("/r/bad.json", "{");
        let err = FsLoader::new(&fs)
            .load_config(Path::new("/r/bad.json"))
            .unwrap_err();
        assert!(err.to_string().contains("bad.json"));
    }

    #[test]
    fn glob_is_relative_to_cwd_and_sorted() {
        let fs = MemoryFs::new()
            .with_file("/r/servers/nginx.yaml", "name: nginx\n")
            .with_file("/r/servers/apache.yaml", "name: apache\n")
            .with_file("/r/servers/nested/fpm.yaml", "name: fpm\n");
        let docs = FsLoader::new(&fs)
            .glob_configs("servers/*.yaml", Path::new("/r"))
            .unwrap();
        let names: Vec<String> = docs.iter().map(LoadedConfig::name).collect();
        assert_eq!(names, ["apache", "nginx"]);
    }

    #[test]
    fn memory_fs_directories_exist() {
        let fs = MemoryFs::new().with_file("/r/certs/ca.pem", "");
        assert!(fs.exists(Path::new("/r/certs")));
        assert!(fs.exists(Path::new("/r/certs/ca.pem")));
        assert!(!fs.exists(Path::new("/r/keys")));
    }

    #[test]
    fn os_fs_loads_and_globs() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("instances")).unwrap();
        fs::write(dir.path().join("instances/b.toml"), "name = \"b\"\n").unwrap();
        fs::write(dir.path().join("instances/a.json"), r#"{"name": "a"}"#).unwrap();
        fs::write(dir.path().join("instances/notes.txt"), "skip").unwrap();

        let os = OsFs;
        let loader = FsLoader::new(&os);
        let docs = loader.glob_configs("instances/[ab].*", dir.path()).unwrap();
        let names: Vec<String> = docs.iter().map(LoadedConfig::name).collect();
        assert_eq!(names, ["a", "b"]);
        assert!(os.exists(&dir.path().join("instances")));
    }
}
