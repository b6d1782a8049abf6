use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RigfileError {
    #[error("{}: at `{location}`: {source}", .path.display())]
    Located {
        path: PathBuf,
        location: String,
        source: Box<RigfileError>,
    },

    #[error("overwriting `{path}` with `{value}` failed: {source}")]
    Overwrite {
        path: String,
        value: String,
        source: Box<RigfileError>,
    },

    #[error("loading config `{}` failed: {reason}", .path.display())]
    Load { path: PathBuf, reason: String },

    // -- schema errors -------------------------------------------------------
    #[error("invalid parameter key `{0}`")]
    InvalidParameterKey(String),

    #[error("invalid default `{value}` for {kind}: {reason}")]
    InvalidDefault {
        value: String,
        kind: &'static str,
        reason: String,
    },

    #[error("default values are not supported for {0} fields")]
    UnsupportedDefault(&'static str),

    #[error("factory function `{0}` not found")]
    FactoryNotFound(String),

    #[error("factory `{factory}` cannot populate a field of type {found}, expected {expected}")]
    FactoryTarget {
        factory: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field `{field}` is declared in the schema of {owner} but not accessible")]
    MissingField { owner: &'static str, field: String },

    // -- data shape errors ---------------------------------------------------
    #[error("config data must be a map, got {0}")]
    ExpectedMap(&'static str),

    #[error("expected {expected}, got {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("value `{value}` overflows {kind}")]
    Overflow { value: String, kind: &'static str },

    #[error("unsupported action type {0}")]
    UnsupportedActionType(&'static str),

    #[error("invalid action `{action}`: {reason}")]
    InvalidAction { action: String, reason: String },

    #[error("unknown action `{0}`")]
    UnknownAction(String),

    #[error("expectation has multiple types: `{first}` and `{second}`")]
    MultipleExpectationTypes { first: String, second: String },

    #[error("invalid expectation key `{0}`")]
    InvalidExpectationKey(String),

    #[error("expectation type missing, one of custom, metrics, output or response is required")]
    MissingExpectationType,

    #[error("unknown sandbox type `{0}`")]
    UnknownSandboxType(String),

    #[error("unknown environment type `{0}`")]
    UnknownEnvironmentType(String),

    #[error("unknown key `{0}`")]
    UnknownKey(String),

    #[error("nesting is deeper than {0} levels")]
    TooDeep(usize),

    #[error("loadable field must be a map or a list, got {0}")]
    UnsupportedLoadable(&'static str),

    // -- validation errors ---------------------------------------------------
    #[error("invalid value `{value}`, allowed values: {}", .allowed.join(", "))]
    InvalidEnumValue { value: String, allowed: Vec<String> },

    #[error("at least one of the keys {} must be present", .keys.join(", "))]
    MissingKeys { keys: Vec<String> },

    #[error("path `{}` does not exist", .0.display())]
    PathNotFound(PathBuf),

    // -- overwrite navigation errors -----------------------------------------
    #[error("field `{0}` not found")]
    FieldNotFound(String),

    #[error("key `{0}` not found")]
    KeyNotFound(String),

    #[error("field `{0}` is an array and requires an index")]
    IndexRequired(String),

    #[error("field `{0}` is not an array and cannot be indexed")]
    IndexNotAllowed(String),

    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("array of arrays are not supported for overwrites")]
    NestedArrays,

    #[error("overwrite cannot be done for object")]
    ObjectOverwrite,

    #[error("{kind} value cannot be nested into `{segment}`")]
    NotNestable {
        kind: &'static str,
        segment: String,
    },

    #[error("invalid path segment `{0}`")]
    InvalidSegment(String),

    #[error("invalid {kind} value `{value}`: {reason}")]
    InvalidNumber {
        value: String,
        kind: &'static str,
        reason: String,
    },

    #[error("overwrite is not supported for {0} fields")]
    UnsupportedKind(&'static str),

    // -- pipeline errors -----------------------------------------------------
    #[error("no configs to merge")]
    NothingToMerge,

    #[error("no config paths given, call .config_path() on the builder")]
    NoConfigPaths,

    #[error("serializing config failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl RigfileError {
    /// The innermost error, with location and overwrite wrappers removed.
    pub fn root(&self) -> &RigfileError {
        match self {
            RigfileError::Located { source, .. } | RigfileError::Overwrite { source, .. } => {
                source.root()
            }
            other => other,
        }
    }
}
