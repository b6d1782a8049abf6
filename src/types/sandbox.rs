//! Sandboxes and environments.
//!
//! Both domains form the same refinement chain:
//! common → local → container → docker | kubernetes. Each refinement embeds
//! its parent, so a Docker sandbox accepts every key a container sandbox does.
//! Documents key them by kind:
//!
//! ```yaml
//! sandboxes:
//!   common:
//!     dirs: { conf: /etc/rig }
//!   docker:
//!     image: { name: php, tag: "8.3-fpm" }
//! ```

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::{schema, variants};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Sandbox {
    Common(CommonSandbox),
    Local(LocalSandbox),
    Container(ContainerSandbox),
    Docker(DockerSandbox),
    Kubernetes(KubernetesSandbox),
}

impl Default for Sandbox {
    fn default() -> Self {
        Sandbox::Common(CommonSandbox::default())
    }
}

impl Sandbox {
    /// The zero value for a document kind key.
    pub fn from_kind(kind: &str) -> Option<Self> {
        Some(match kind {
            "common" => Sandbox::Common(CommonSandbox::default()),
            "local" => Sandbox::Local(LocalSandbox::default()),
            "container" => Sandbox::Container(ContainerSandbox::default()),
            "docker" => Sandbox::Docker(DockerSandbox::default()),
            "kubernetes" => Sandbox::Kubernetes(KubernetesSandbox::default()),
            _ => return None,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Sandbox::Common(_) => "common",
            Sandbox::Local(_) => "local",
            Sandbox::Container(_) => "container",
            Sandbox::Docker(_) => "docker",
            Sandbox::Kubernetes(_) => "kubernetes",
        }
    }

    /// The shared part every sandbox kind carries.
    pub fn common(&self) -> &CommonSandbox {
        match self {
            Sandbox::Common(s) => s,
            Sandbox::Local(s) => &s.common,
            Sandbox::Container(s) => &s.local.common,
            Sandbox::Docker(s) => &s.container.local.common,
            Sandbox::Kubernetes(s) => &s.container.local.common,
        }
    }
}

variants!(Sandbox {
    Common,
    Local,
    Container,
    Docker,
    Kubernetes,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonSandbox {
    pub available: bool,
    pub dirs: BTreeMap<String, String>,
    pub hooks: BTreeMap<String, SandboxHook>,
}

schema! {
    CommonSandbox {
        available => "available,default=true",
        dirs => "dirs,keys=conf|run|script",
        hooks => "hooks,string=command",
    }
}

/// A command run around a sandbox lifecycle event. A bare string is the
/// command.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SandboxHook {
    pub command: String,
    pub args: Vec<String>,
    pub shell: String,
}

schema! {
    SandboxHook {
        command => "command",
        args => "args",
        shell => "shell,default=/bin/sh",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalSandbox {
    #[serde(flatten)]
    pub common: CommonSandbox,
}

schema! {
    LocalSandbox {
        ..common,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerSandbox {
    #[serde(flatten)]
    pub local: LocalSandbox,
    pub image: ContainerImage,
    pub registry: ContainerRegistry,
}

schema! {
    ContainerSandbox {
        ..local,
        image => "image",
        registry => "registry",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerImage {
    pub name: String,
    pub tag: String,
}

schema! {
    ContainerImage {
        name => "name",
        tag => "tag,default=latest",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerRegistry {
    pub auth: ContainerRegistryAuth,
}

schema! {
    ContainerRegistry {
        auth => "auth",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerRegistryAuth {
    pub username: String,
    pub password: String,
}

schema! {
    ContainerRegistryAuth {
        username => "username",
        password => "password",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DockerSandbox {
    #[serde(flatten)]
    pub container: ContainerSandbox,
    pub network_name: String,
}

schema! {
    DockerSandbox {
        ..container,
        network_name => "network_name",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KubernetesSandbox {
    #[serde(flatten)]
    pub container: ContainerSandbox,
    pub auth: KubernetesAuth,
    pub namespace: String,
}

schema! {
    KubernetesSandbox {
        ..container,
        auth => "auth",
        namespace => "namespace,default=default",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KubernetesAuth {
    pub kubeconfig: String,
}

schema! {
    KubernetesAuth {
        kubeconfig => "kubeconfig,path",
    }
}

// -- environments -------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Environment {
    Common(CommonEnvironment),
    Local(LocalEnvironment),
    Container(ContainerEnvironment),
    Docker(DockerEnvironment),
    Kubernetes(KubernetesEnvironment),
}

impl Default for Environment {
    fn default() -> Self {
        Environment::Common(CommonEnvironment::default())
    }
}

impl Environment {
    pub fn from_kind(kind: &str) -> Option<Self> {
        Some(match kind {
            "common" => Environment::Common(CommonEnvironment::default()),
            "local" => Environment::Local(LocalEnvironment::default()),
            "container" => Environment::Container(ContainerEnvironment::default()),
            "docker" => Environment::Docker(DockerEnvironment::default()),
            "kubernetes" => Environment::Kubernetes(KubernetesEnvironment::default()),
            _ => return None,
        })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Environment::Common(_) => "common",
            Environment::Local(_) => "local",
            Environment::Container(_) => "container",
            Environment::Docker(_) => "docker",
            Environment::Kubernetes(_) => "kubernetes",
        }
    }
}

variants!(Environment {
    Common,
    Local,
    Container,
    Docker,
    Kubernetes,
});

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommonEnvironment {
    pub ports: EnvironmentPorts,
}

schema! {
    CommonEnvironment {
        ports => "ports",
    }
}

/// Host port range handed out to published services.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EnvironmentPorts {
    pub start: u16,
    pub end: u16,
}

schema! {
    EnvironmentPorts {
        start => "start,default=30000",
        end => "end,default=31000",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalEnvironment {
    #[serde(flatten)]
    pub common: CommonEnvironment,
}

schema! {
    LocalEnvironment {
        ..common,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContainerEnvironment {
    #[serde(flatten)]
    pub local: LocalEnvironment,
    pub registry: ContainerRegistry,
}

schema! {
    ContainerEnvironment {
        ..local,
        registry => "registry",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DockerEnvironment {
    #[serde(flatten)]
    pub container: ContainerEnvironment,
    pub name_prefix: String,
}

schema! {
    DockerEnvironment {
        ..container,
        name_prefix => "name_prefix,default=test",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KubernetesEnvironment {
    #[serde(flatten)]
    pub container: ContainerEnvironment,
    pub namespace: String,
    pub kubeconfig: String,
}

schema! {
    KubernetesEnvironment {
        ..container,
        namespace => "namespace,default=default",
        kubeconfig => "kubeconfig,path",
    }
}
