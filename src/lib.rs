//! Compile declarative test-rig definitions into one typed config.
//!
//! A rig is described by one or more YAML, JSON or TOML documents: the
//! servers under test, the sandboxes they run in, and instances made of
//! services and actions. Rigfile walks those untyped documents onto a typed
//! [`Config`], merges several documents into one, and applies dotted-path
//! overwrites on top.
//!
//! ```ignore
//! let config = Rigfile::builder()
//!     .config_path("rig/base.yaml")
//!     .config_path("rig/local.yaml")
//!     .overwrite("spec.instances[0].timeout", "20000")
//!     .make()?;
//! ```
//!
//! # Schema as source of truth
//!
//! Every config struct registers its fields with a tag string such as
//! `"sandbox,enum=local|docker|kubernetes,default=local"`. The tag gives the
//! document name of the field and a set of directives:
//!
//! - **`default=`** fills an absent field (integers, booleans, strings).
//! - **`enum=`** and **`keys=`** validate the value before assignment.
//! - **`path`** resolves a filesystem path relative to the document that
//!   declares it and checks that it exists.
//! - **`loadable`** accepts a glob pattern; every matching document becomes
//!   an element of the field.
//! - **`string=`** lets a bare string stand for a struct with one sub-field.
//! - **`factory=`** hands the field to a named [`FactoryFn`], used for
//!   polymorphic fields such as actions and sandboxes.
//!
//! The same registration drives the [`Walker`], the overwrite engine and
//! leaf listing, so a path printed by [`list_leaves`] is a path
//! [`overwrite`] accepts.
//!
//! # Pipeline
//!
//! ```text
//! Load        every config path, format picked by extension
//!    ↓
//! Walk        each document into a fresh Config (defaults, validation, factories)
//!    ↓
//! Merge       left to right, later documents win
//!    ↓
//! Overwrite   path=value pairs applied to the merged config
//! ```
//!
//! The first failure stops the pipeline. Walk errors carry the document path
//! and the location inside it (`servers[0].port`); overwrite errors carry
//! the offending path and value.
//!
//! # Actions
//!
//! Actions are written as `verb[/service[/name]]` keys, for example
//! `start/fpm`, `expect/fpm/status` or the string shorthand `bench/fpm`.
//! Expectations pick their concrete type from their single type key
//! (`custom`, `metrics`, `output` or `response`). See [`parse_action`].
//!
//! # Core library, no CLI framework required
//!
//! The builder works without any argument parser. With the `clap` Cargo
//! feature (on by default) the `cli` module provides `CompileArgs`, a derive
//! struct with `--config`, `--overwrite` and `--strict` flags that bridges to
//! [`RigfileBuilder`].
//!
//! # Error handling
//!
//! All fallible operations return [`RigfileError`]. Use
//! [`RigfileError::root`] to look past the location and overwrite wrappers.

pub mod error;
pub mod listing;
pub mod loader;
pub mod location;
pub mod schema;
pub mod tag;
pub mod types;
pub mod walker;

mod actions;
mod builder;
#[cfg(feature = "clap")]
pub mod cli;
pub mod factory;
pub(crate) mod merge;
pub mod overwrite;
pub mod resolve;

#[cfg(test)]
mod fixtures;

pub use actions::parse_action;
pub use builder::{Rigfile, RigfileBuilder};
#[cfg(feature = "clap")]
pub use cli::CompileArgs;
pub use error::RigfileError;
pub use factory::{Factories, FactoryFn};
pub use listing::{ConfigListing, list_leaves};
pub use loader::{Fs, FsLoader, LoadedConfig, Loader, MemoryFs, OsFs};
pub use location::Location;
pub use merge::{Merge, merge_configs};
pub use overwrite::{overwrite, overwrite_node};
pub use tag::{Directives, parse_tag};
pub use types::Config;
pub use walker::Walker;
