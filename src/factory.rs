//! Factory dispatch for polymorphic fields.
//!
//! A field tagged `factory=<name>` is not assigned structurally: the walker
//! hands the raw value and the field to the registered function, which picks
//! concrete variants and walks them itself. Factories receive the field as a
//! `&mut dyn Node` and recover its concrete type with [`downcast`].

use std::collections::{BTreeMap, HashMap};

use serde_json::Value;
use tracing::trace;

use crate::actions;
use crate::error::RigfileError;
use crate::schema::Node;
use crate::types::{Environment, Sandbox};
use crate::walker::{Walker, mismatch};

pub type FactoryFn = fn(&mut Walker<'_>, &Value, &mut dyn Node) -> Result<(), RigfileError>;

/// Name → factory registry.
#[derive(Clone)]
pub struct Factories {
    funcs: HashMap<String, FactoryFn>,
}

impl Default for Factories {
    /// The built-in factories: `actions`, `action`, `sandboxes`, `environments`.
    fn default() -> Self {
        let mut factories = Self::empty();
        factories.register("actions", actions::create_actions);
        factories.register("action", actions::create_action);
        factories.register("sandboxes", create_sandboxes);
        factories.register("environments", create_environments);
        factories
    }
}

impl Factories {
    pub fn empty() -> Self {
        Self {
            funcs: HashMap::new(),
        }
    }

    /// Register `func` under `name`, returning the factory it replaced.
    pub fn register(&mut self, name: &str, func: FactoryFn) -> Option<FactoryFn> {
        self.funcs.insert(name.to_string(), func)
    }

    pub fn get(&self, name: &str) -> Option<FactoryFn> {
        self.funcs.get(name).copied()
    }
}

impl std::fmt::Debug for Factories {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.funcs.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("Factories").field("names", &names).finish()
    }
}

/// Recover the concrete type of a factory-managed field.
pub fn downcast<'t, T: 'static>(
    target: &'t mut dyn Node,
    factory: &str,
) -> Result<&'t mut T, RigfileError> {
    let found = target.type_name();
    target
        .as_any_mut()
        .downcast_mut::<T>()
        .ok_or_else(|| RigfileError::FactoryTarget {
            factory: factory.to_string(),
            expected: std::any::type_name::<T>(),
            found,
        })
}

fn create_sandboxes(
    w: &mut Walker<'_>,
    data: &Value,
    target: &mut dyn Node,
) -> Result<(), RigfileError> {
    create_by_kind(
        w,
        data,
        target,
        "sandboxes",
        Sandbox::from_kind,
        RigfileError::UnknownSandboxType,
    )
}

fn create_environments(
    w: &mut Walker<'_>,
    data: &Value,
    target: &mut dyn Node,
) -> Result<(), RigfileError> {
    create_by_kind(
        w,
        data,
        target,
        "environments",
        Environment::from_kind,
        RigfileError::UnknownEnvironmentType,
    )
}

/// Populate a map whose keys name the variant of each value.
fn create_by_kind<T: Node>(
    w: &mut Walker<'_>,
    data: &Value,
    target: &mut dyn Node,
    factory: &str,
    from_kind: fn(&str) -> Option<T>,
    unknown: fn(String) -> RigfileError,
) -> Result<(), RigfileError> {
    let entries = data.as_object().ok_or_else(|| mismatch("map", data))?;
    let map: &mut BTreeMap<String, T> = downcast(target, factory)?;
    map.clear();
    w.location_mut().start_object();
    for (kind, value) in entries {
        w.location_mut().set_field(kind);
        trace!(factory, kind = kind.as_str(), "creating variant");
        let mut item = from_kind(kind).ok_or_else(|| unknown(kind.clone()))?;
        w.assign(value, &mut item)?;
        map.insert(kind.clone(), item);
    }
    w.location_mut().end_object();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::test::memory_fs;
    use crate::loader::FsLoader;
    use crate::types::Config;
    use serde_json::json;
    use std::path::Path;

    fn parse(data: Value) -> Result<Config, RigfileError> {
        let fs = memory_fs(&[("/rig/kube/config", "")]);
        let loader = FsLoader::new(&fs);
        let factories = Factories::default();
        let mut config = Config::default();
        Walker::new(&loader, &fs, &factories).parse_config(
            &data,
            &mut config,
            Path::new("/rig/main.yaml"),
        )?;
        Ok(config)
    }

    #[test]
    fn builtins_registered() {
        let factories = Factories::default();
        for name in ["actions", "action", "sandboxes", "environments"] {
            assert!(factories.get(name).is_some(), "{name}");
        }
        assert!(Factories::empty().get("actions").is_none());
    }

    #[test]
    fn sandboxes_keyed_by_kind() {
        let config = parse(json!({
            "sandboxes": {
                "local": {"dirs": {"run": "/run"}},
                "docker": {"image": {"name": "php"}, "network_name": "rig", "available": false},
                "kubernetes": {"auth": {"kubeconfig": "kube/config"}}
            }
        }))
        .unwrap();
        let Sandbox::Docker(docker) = &config.sandboxes["docker"] else {
            panic!("expected docker sandbox");
        };
        assert_eq!(docker.network_name, "rig");
        assert_eq!(docker.container.image.name, "php");
        assert_eq!(docker.container.image.tag, "latest");
        assert!(!docker.container.local.common.available);

        let Sandbox::Kubernetes(kube) = &config.sandboxes["kubernetes"] else {
            panic!("expected kubernetes sandbox");
        };
        assert_eq!(kube.auth.kubeconfig, "/rig/kube/config");
        assert_eq!(kube.namespace, "default");
        assert!(config.sandboxes["local"].common().available);
    }

    #[test]
    fn unknown_sandbox_kind() {
        let err = parse(json!({"sandboxes": {"podman": {}}})).unwrap_err();
        assert!(matches!(err.root(), RigfileError::UnknownSandboxType(k) if k == "podman"));
        let RigfileError::Located { location, .. } = &err else {
            panic!("expected located error");
        };
        assert_eq!(location, "sandboxes.podman");
    }

    #[test]
    fn environments_keyed_by_kind() {
        let config = parse(json!({
            "spec": {"instances": [{
                "environments": {
                    "docker": {"ports": {"start": 40000}},
                    "vm": {}
                }
            }]}
        }))
        .unwrap_err();
        assert!(matches!(config.root(), RigfileError::UnknownEnvironmentType(k) if k == "vm"));

        let config = parse(json!({
            "spec": {"instances": [{
                "environments": {"docker": {"ports": {"start": 40000}}}
            }]}
        }))
        .unwrap();
        let Environment::Docker(docker) = &config.spec.instances[0].environments["docker"] else {
            panic!("expected docker environment");
        };
        assert_eq!(docker.name_prefix, "test");
        assert_eq!(docker.container.local.common.ports.start, 40000);
        assert_eq!(docker.container.local.common.ports.end, 31000);
    }

    #[test]
    fn missing_factory() {
        use crate::fixtures::test::Unregistered;
        let fs = crate::loader::MemoryFs::new();
        let loader = FsLoader::new(&fs);
        let factories = Factories::default();
        let mut target = Unregistered::default();
        let err = Walker::new(&loader, &fs, &factories)
            .parse_config(&json!({"items": []}), &mut target, Path::new("x.yaml"))
            .unwrap_err();
        assert!(matches!(err.root(), RigfileError::FactoryNotFound(n) if n == "nowhere"));
    }

    #[test]
    fn downcast_wrong_type() {
        let mut value = 3i32;
        let err = downcast::<String>(&mut value, "sandboxes").unwrap_err();
        assert!(matches!(err, RigfileError::FactoryTarget { found: "i32", .. }));
    }
}
