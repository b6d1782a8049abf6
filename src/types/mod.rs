//! The typed rig model.
//!
//! Every struct here registers its fields with [`schema!`] so the walker can
//! populate it from untyped documents and the overwrite engine can address it
//! by dotted path. Tag strings follow `name[,key[=value]]*`; see
//! [`crate::tag`] for the directive set.

mod action;
mod sandbox;

use std::collections::BTreeMap;

use serde::Serialize;

use crate::schema::schema;

pub use action::{
    Action, BenchAction, CustomExpectation, CustomExpectationAction, ExecuteAction,
    MetricRule, MetricsExpectation, MetricsExpectationAction, NotAction, OutputExpectation,
    OutputExpectationAction, ParallelAction, ReloadAction, RequestAction, ResponseBody,
    ResponseExpectation, ResponseExpectationAction, RestartAction, SequentialAction,
    StartAction, StopAction,
};
pub use sandbox::{
    CommonEnvironment, CommonSandbox, ContainerEnvironment, ContainerImage, ContainerRegistry,
    ContainerRegistryAuth, ContainerSandbox, DockerEnvironment, DockerSandbox, Environment,
    EnvironmentPorts, KubernetesAuth, KubernetesEnvironment, KubernetesSandbox,
    LocalEnvironment, LocalSandbox, Sandbox, SandboxHook,
};

/// A compiled rig definition.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Config {
    pub version: String,
    pub name: String,
    pub description: String,
    pub sandboxes: BTreeMap<String, Sandbox>,
    pub servers: Vec<Server>,
    pub spec: Spec,
}

schema! {
    Config {
        version => "version,enum=0.1,default=0.1",
        name => "name",
        description => "description",
        sandboxes => "sandboxes,factory=sandboxes",
        servers => "servers,loadable",
        spec => "spec",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Spec {
    pub workspace: String,
    pub instances: Vec<Instance>,
}

schema! {
    Spec {
        workspace => "workspace",
        instances => "instances,loadable",
    }
}

/// One self-contained test scenario: the services it runs, where they run
/// and the actions exercised against them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Instance {
    pub name: String,
    pub resources: Resources,
    pub services: BTreeMap<String, Service>,
    pub environments: BTreeMap<String, Environment>,
    pub actions: Vec<Action>,
    /// Milliseconds.
    pub timeout: i32,
}

schema! {
    Instance {
        name => "name",
        resources => "resources",
        services => "services",
        environments => "environments,factory=environments",
        actions => "actions,factory=actions",
        timeout => "timeout,default=600000",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Resources {
    pub certificates: BTreeMap<String, Certificate>,
    pub scripts: BTreeMap<String, Script>,
}

schema! {
    Resources {
        certificates => "certificates",
        scripts => "scripts,string=content",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Certificate {
    pub certificate: String,
    pub private_key: String,
}

schema! {
    Certificate {
        certificate => "certificate",
        private_key => "private_key",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Script {
    pub content: String,
    pub path: String,
    pub mode: String,
    pub parameters: BTreeMap<String, String>,
}

schema! {
    Script {
        content => "content",
        path => "path,path",
        mode => "mode,default=0644",
        parameters => "parameters",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Service {
    pub server: ServiceServer,
    pub sandbox: String,
    pub requires: Vec<String>,
    pub public: ServicePublic,
    pub resources: ServiceResources,
}

schema! {
    Service {
        server => "server",
        sandbox => "sandbox,enum=local|docker|kubernetes,default=local",
        requires => "requires",
        public => "public",
        resources => "resources",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceServer {
    pub name: String,
    pub port: u16,
    pub configs: BTreeMap<String, ServiceConfig>,
    pub parameters: BTreeMap<String, String>,
}

schema! {
    ServiceServer {
        name => "name",
        port => "port",
        configs => "configs",
        parameters => "parameters",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceConfig {
    pub parameters: BTreeMap<String, String>,
    pub include: bool,
}

schema! {
    ServiceConfig {
        parameters => "parameters",
        include => "include,default=true",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServicePublic {
    pub port: u16,
}

schema! {
    ServicePublic {
        port => "port,default=80",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceResources {
    pub certificates: Vec<String>,
    pub scripts: Vec<String>,
}

schema! {
    ServiceResources {
        certificates => "certificates",
        scripts => "scripts",
    }
}

/// A server definition that services refer to by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Server {
    pub name: String,
    pub extends: String,
    pub port: u16,
    pub configs: BTreeMap<String, ServerConfig>,
    pub templates: BTreeMap<String, ServerTemplate>,
    pub parameters: BTreeMap<String, String>,
}

schema! {
    Server {
        name => "name",
        extends => "extends",
        port => "port,default=80",
        configs => "configs",
        templates => "templates",
        parameters => "parameters",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerConfig {
    pub file: String,
    pub parameters: BTreeMap<String, String>,
}

schema! {
    ServerConfig {
        file => "file,path",
        parameters => "parameters",
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServerTemplate {
    pub file: String,
}

schema! {
    ServerTemplate {
        file => "file,path",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StructNode;
    use crate::tag::parse_tag;

    fn assert_tags_parse(node: &dyn StructNode) {
        for field in node.fields() {
            parse_tag(field.tag).unwrap_or_else(|e| {
                panic!("{}.{}: {e}", node.struct_name(), field.ident)
            });
        }
    }

    #[test]
    fn every_schema_tag_parses() {
        assert_tags_parse(&Config::default());
        assert_tags_parse(&Spec::default());
        assert_tags_parse(&Instance::default());
        assert_tags_parse(&Resources::default());
        assert_tags_parse(&Script::default());
        assert_tags_parse(&Service::default());
        assert_tags_parse(&ServiceConfig::default());
        assert_tags_parse(&Server::default());
        assert_tags_parse(&CommonSandbox::default());
        assert_tags_parse(&KubernetesSandbox::default());
        assert_tags_parse(&DockerEnvironment::default());
        assert_tags_parse(&RequestAction::default());
        assert_tags_parse(&OutputExpectation::default());
        assert_tags_parse(&ResponseBody::default());
    }

    #[test]
    fn config_serializes_with_document_names() {
        let config = Config {
            name: "rig".into(),
            ..Config::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["name"], "rig");
        assert!(value["spec"]["instances"].as_array().unwrap().is_empty());
    }
}
