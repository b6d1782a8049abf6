//! Core resolution pipeline: walk, merge and overwrite.
//!
//! Operates on pre-loaded documents (`ResolveInput`) and does no I/O of its
//! own beyond what loadable and path fields ask of the injected loader and
//! filesystem. Steps:
//!
//! 1. Walk each document into a fresh [`Config`] (strict mode rejects unknown keys)
//! 2. Merge the configs (later documents win)
//! 3. Apply overwrites on top
//!
//! The first failure halts the pipeline.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::RigfileError;
use crate::factory::Factories;
use crate::loader::{Fs, LoadedConfig, Loader};
use crate::merge::merge_configs;
use crate::overwrite::overwrite;
use crate::types::Config;
use crate::walker::Walker;

/// Everything needed to compile a config.
pub struct ResolveInput {
    /// Documents in precedence order: first = lowest priority, last = highest.
    pub documents: Vec<LoadedConfig>,
    /// Path → value overwrites applied after merging.
    pub overwrites: HashMap<String, String>,
    /// Whether to reject unknown keys in documents.
    pub strict: bool,
}

/// Compile `input` into a single config.
pub fn resolve(
    input: ResolveInput,
    loader: &dyn Loader,
    fs: &dyn Fs,
    factories: &Factories,
) -> Result<Config, RigfileError> {
    let mut configs = Vec::with_capacity(input.documents.len());
    for doc in &input.documents {
        let mut config = Config::default();
        Walker::new(loader, fs, factories)
            .strict(input.strict)
            .parse_config(&Value::Object(doc.data().clone()), &mut config, doc.path())?;
        configs.push(config);
    }

    let mut config = merge_configs(configs)?;
    overwrite(&mut config, &input.overwrites)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::memory_fs;
    use crate::loader::{FsLoader, MemoryFs};
    use crate::types::Action;
    use serde_json::json;

    fn doc(path: &str, data: Value) -> LoadedConfig {
        let Value::Object(map) = data else {
            panic!("document must be a map");
        };
        LoadedConfig::new(path, map)
    }

    fn input(documents: Vec<LoadedConfig>) -> ResolveInput {
        ResolveInput {
            documents,
            overwrites: HashMap::new(),
            strict: false,
        }
    }

    fn run(input: ResolveInput, fs: &MemoryFs) -> Result<Config, RigfileError> {
        resolve(input, &FsLoader::new(fs), fs, &Factories::default())
    }

    #[test]
    fn no_documents() {
        let err = run(input(vec![]), &MemoryFs::new()).unwrap_err();
        assert!(matches!(err, RigfileError::NothingToMerge));
    }

    #[test]
    fn version_defaults_and_is_validated() {
        let config = run(input(vec![doc("/rig/a.yaml", json!({}))]), &MemoryFs::new()).unwrap();
        assert_eq!(config.version, "0.1");

        let err = run(
            input(vec![doc("/rig/a.yaml", json!({"version": "2.0"}))]),
            &MemoryFs::new(),
        )
        .unwrap_err();
        assert!(matches!(err.root(), RigfileError::InvalidEnumValue { .. }));
    }

    #[test]
    fn documents_merge_in_order() {
        let config = run(
            input(vec![
                doc(
                    "/rig/base.yaml",
                    json!({"name": "base", "servers": [{"name": "nginx"}]}),
                ),
                doc(
                    "/rig/local.yaml",
                    json!({"description": "local", "servers": [{"name": "fpm"}]}),
                ),
            ]),
            &MemoryFs::new(),
        )
        .unwrap();
        assert_eq!(config.name, "base");
        assert_eq!(config.description, "local");
        let names: Vec<&str> = config.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["nginx", "fpm"]);
        assert_eq!(config.servers[0].port, 80);
    }

    #[test]
    fn overwrites_apply_after_merge() {
        let mut run_input = input(vec![doc(
            "/rig/main.yaml",
            json!({"spec": {"instances": [{"name": "i", "actions": [{"start/fpm": {"timeout": 50000}}]}]}}),
        )]);
        run_input.overwrites.insert(
            "spec.instances[0].actions[0].timeout".into(),
            "20000".into(),
        );
        let config = run(run_input, &MemoryFs::new()).unwrap();
        let Action::Start(start) = &config.spec.instances[0].actions[0] else {
            panic!("expected start action");
        };
        assert_eq!(start.timeout, 20000);
        assert_eq!(config.spec.instances[0].timeout, 600000);
    }

    #[test]
    fn overwrite_failure_stops_pipeline() {
        let mut run_input = input(vec![doc("/rig/main.yaml", json!({}))]);
        run_input.overwrites.insert("spec".into(), "x".into());
        let err = run(run_input, &MemoryFs::new()).unwrap_err();
        assert!(matches!(err, RigfileError::Overwrite { .. }));
    }

    #[test]
    fn loadable_servers_from_glob() {
        let fs = memory_fs(&[
            ("/rig/servers/nginx.yaml", "name: nginx\nport: 8080\n"),
            ("/rig/servers/fpm.toml", "name = \"fpm\"\n"),
        ]);
        let config = run(
            input(vec![doc("/rig/main.yaml", json!({"servers": "servers/*"}))]),
            &fs,
        )
        .unwrap();
        let names: Vec<&str> = config.servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["fpm", "nginx"]);
        assert_eq!(config.servers[1].port, 8080);
    }

    #[test]
    fn loaded_document_paths_resolve_relative_to_themselves() {
        let fs = memory_fs(&[
            (
                "/rig/servers/nginx.yaml",
                "name: nginx\nconfigs:\n  main:\n    file: conf/nginx.conf\n",
            ),
            ("/rig/servers/conf/nginx.conf", ""),
        ]);
        let config = run(
            input(vec![doc("/rig/main.yaml", json!({"servers": "servers/*.yaml"}))]),
            &fs,
        )
        .unwrap();
        assert_eq!(
            config.servers[0].configs["main"].file,
            "/rig/servers/conf/nginx.conf"
        );
    }

    #[test]
    fn errors_in_loaded_documents_name_that_document() {
        let fs = memory_fs(&[("/rig/servers/bad.yaml", "name: bad\nport: huge\n")]);
        let err = run(
            input(vec![doc("/rig/main.yaml", json!({"servers": "servers/*.yaml"}))]),
            &fs,
        )
        .unwrap_err();
        let RigfileError::Located { path, location, .. } = &err else {
            panic!("expected located error, got {err}");
        };
        assert_eq!(path.to_str(), Some("/rig/servers/bad.yaml"));
        assert_eq!(location, "servers[0].port");
    }

    #[test]
    fn loadable_instances_inside_spec() {
        let fs = memory_fs(&[(
            "/rig/instances/basic.yaml",
            "name: basic\nservices:\n  fpm:\n    server:\n      name: fpm\nactions:\n  - start/fpm:\n  - bench/fpm\n",
        )]);
        let config = run(
            input(vec![doc(
                "/rig/main.yaml",
                json!({"spec": {"workspace": "/tmp/ws", "instances": "instances/*.yaml"}}),
            )]),
            &fs,
        )
        .unwrap();
        let instance = &config.spec.instances[0];
        assert_eq!(instance.name, "basic");
        assert_eq!(instance.services["fpm"].sandbox, "local");
        assert_eq!(instance.services["fpm"].public.port, 0);
        assert_eq!(instance.actions.len(), 2);
        assert_eq!(instance.actions[1].verb(), "bench");
    }

    #[test]
    fn strict_mode_applies_to_documents() {
        let documents = vec![doc("/rig/main.yaml", json!({"nmae": "typo"}))];
        let err = run(
            ResolveInput {
                documents: documents.clone(),
                overwrites: HashMap::new(),
                strict: true,
            },
            &MemoryFs::new(),
        )
        .unwrap_err();
        assert!(matches!(err.root(), RigfileError::UnknownKey(k) if k == "nmae"));
        run(input(documents), &MemoryFs::new()).unwrap();
    }
}
