use std::collections::HashMap;
use std::path::PathBuf;

use tracing::debug;

use crate::error::RigfileError;
use crate::factory::{Factories, FactoryFn};
use crate::loader::{Fs, FsLoader, Loader, OsFs};
use crate::resolve::{self, ResolveInput};
use crate::types::Config;

/// Entry point for compiling rig configs.
pub struct Rigfile;

impl Rigfile {
    pub fn builder() -> RigfileBuilder {
        RigfileBuilder::new()
    }
}

/// Builder for loading, merging and overwriting config documents.
///
/// ```ignore
/// let config = Rigfile::builder()
///     .config_path("rig/base.yaml")
///     .config_path("rig/local.yaml")
///     .overwrite("spec.instances[0].timeout", "20000")
///     .make()?;
/// ```
pub struct RigfileBuilder {
    config_paths: Vec<PathBuf>,
    overwrites: HashMap<String, String>,
    strict: bool,
    fs: Box<dyn Fs>,
    factories: Factories,
}

impl RigfileBuilder {
    fn new() -> Self {
        Self {
            config_paths: Vec::new(),
            overwrites: HashMap::new(),
            strict: false,
            fs: Box::new(OsFs),
            factories: Factories::default(),
        }
    }

    /// Add a config document. Later documents take precedence when merged.
    pub fn config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_paths.push(path.into());
        self
    }

    pub fn config_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config_paths.extend(paths.into_iter().map(Into::into));
        self
    }

    /// Overwrite the value at `path` after merging. A repeated path replaces
    /// the earlier value.
    pub fn overwrite(mut self, path: &str, value: &str) -> Self {
        self.overwrites.insert(path.to_string(), value.to_string());
        self
    }

    pub fn overwrites(mut self, overwrites: HashMap<String, String>) -> Self {
        self.overwrites.extend(overwrites);
        self
    }

    /// Reject document keys that match no field (default: off).
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Read documents and check paths through `fs` instead of the real
    /// filesystem.
    pub fn fs(mut self, fs: impl Fs + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    /// Register an extra factory, replacing a built-in of the same name.
    pub fn factory(mut self, name: &str, func: FactoryFn) -> Self {
        self.factories.register(name, func);
        self
    }

    /// Load every config path, then walk, merge and overwrite.
    pub fn make(self) -> Result<Config, RigfileError> {
        let Self {
            config_paths,
            overwrites,
            strict,
            fs,
            factories,
        } = self;
        if config_paths.is_empty() {
            return Err(RigfileError::NoConfigPaths);
        }
        debug!(
            documents = config_paths.len(),
            overwrites = overwrites.len(),
            strict,
            "compiling config"
        );

        let loader = FsLoader::new(fs.as_ref());
        let documents = loader.load_configs(&config_paths)?;
        let input = ResolveInput {
            documents,
            overwrites,
            strict,
        };
        resolve::resolve(input, &loader, fs.as_ref(), &factories)
    }
}
