//! Clap adapter for rigfile.
//!
//! Compiled only with the `clap` Cargo feature (on by default). [`CompileArgs`]
//! can be flattened into an application's own `#[derive(Parser)]` struct; its
//! [`into_builder()`](CompileArgs::into_builder) is the only bridge to the
//! clap-free core.
//!
//! ```ignore
//! #[derive(Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     compile: CompileArgs,
//! }
//!
//! let config = Cli::parse().compile.into_builder().make()?;
//! ```

use std::path::PathBuf;

use clap::Args;

use crate::builder::{Rigfile, RigfileBuilder};

#[derive(Debug, Clone, Args)]
pub struct CompileArgs {
    /// Config file to load. Repeat to merge several; later files win.
    #[arg(short, long = "config", value_name = "PATH", required = true)]
    pub configs: Vec<PathBuf>,

    /// Overwrite a compiled value, e.g. `spec.instances[0].timeout=20000`.
    #[arg(short, long = "overwrite", value_name = "PATH=VALUE", value_parser = parse_overwrite)]
    pub overwrites: Vec<(String, String)>,

    /// Reject keys that match no field.
    #[arg(long)]
    pub strict: bool,
}

impl CompileArgs {
    pub fn into_builder(self) -> RigfileBuilder {
        let mut builder = Rigfile::builder()
            .config_paths(self.configs)
            .strict(self.strict);
        for (path, value) in self.overwrites {
            builder = builder.overwrite(&path, &value);
        }
        builder
    }
}

fn parse_overwrite(raw: &str) -> Result<(String, String), String> {
    let (path, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected PATH=VALUE, got `{raw}`"))?;
    if path.is_empty() {
        return Err(format!("empty path in `{raw}`"));
    }
    Ok((path.to_string(), value.to_string()))
}
