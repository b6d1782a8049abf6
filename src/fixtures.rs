#[cfg(test)]
pub mod test {
    use std::collections::BTreeMap;

    use serde::Serialize;

    use crate::loader::MemoryFs;
    use crate::schema::schema;
    use crate::types::{
        Action, Config, ContainerImage, ContainerSandbox, DockerSandbox, Instance, LocalSandbox,
        OutputExpectation, OutputExpectationAction, Sandbox, SandboxHook, Server, Service,
        ServiceServer, Spec, StartAction,
    };

    /// One field per scalar kind, plus a list of lists.
    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Numbers {
        pub small: i8,
        pub count: u16,
        pub ratio: f32,
        pub flag: bool,
        pub label: String,
        pub grid: Vec<Vec<i32>>,
    }

    schema! {
        Numbers {
            small => "small",
            count => "count",
            ratio => "ratio",
            flag => "flag",
            label => "label",
            grid => "grid",
        }
    }

    // -- Fixtures for embedding ----------------------------------------------

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct BaseFixture {
        pub base_name: String,
        pub base_port: u16,
    }

    schema! {
        BaseFixture {
            base_name => "base_name",
            base_port => "base_port,default=22",
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct RefinedFixture {
        #[serde(flatten)]
        pub base: BaseFixture,
        pub extra: i32,
    }

    schema! {
        RefinedFixture {
            ..base,
            extra => "extra",
        }
    }

    // -- Fixtures for directives ---------------------------------------------

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Defaults {
        pub port: u16,
        pub retries: i32,
        pub enabled: bool,
        pub mode: String,
        pub plain: String,
        pub count: i64,
    }

    schema! {
        Defaults {
            port => "port,default=8080",
            retries => "retries,default=-3",
            enabled => "enabled,default=true",
            mode => "mode,default=fast",
            plain => "plain",
            count => "count",
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Validated {
        pub mode: String,
        pub dirs: BTreeMap<String, String>,
        pub file: String,
    }

    schema! {
        Validated {
            mode => "mode,enum=fast|slow",
            dirs => "dirs,keys=conf|run|script",
            file => "file,path",
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Shorthand {
        pub hook: SandboxHook,
        pub hooks: BTreeMap<String, SandboxHook>,
    }

    schema! {
        Shorthand {
            hook => "hook,string=command",
            hooks => "hooks,string=command",
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Unregistered {
        pub items: Vec<String>,
    }

    schema! {
        Unregistered {
            items => "items,factory=nowhere",
        }
    }

    // -- Recursive fixtures --------------------------------------------------

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Leaf {
        pub value: i32,
        pub children: Vec<Leaf>,
    }

    schema! {
        Leaf {
            value => "value",
            children => "children",
        }
    }

    #[derive(Debug, Clone, Default, PartialEq, Serialize)]
    pub struct Nested {
        pub leaves: Vec<Leaf>,
    }

    schema! {
        Nested {
            leaves => "leaves",
        }
    }

    pub fn memory_fs(files: &[(&str, &str)]) -> MemoryFs {
        files
            .iter()
            .fold(MemoryFs::new(), |fs, (path, contents)| fs.with_file(*path, *contents))
    }

    /// A small compiled config touching servers, sandboxes and actions.
    pub fn sample_config() -> Config {
        let nginx = Server {
            name: "nginx".into(),
            port: 8080,
            parameters: BTreeMap::from([
                ("memory_limit".to_string(), "128M".to_string()),
                ("workers".to_string(), "4".to_string()),
            ]),
            ..Server::default()
        };
        let fpm = Server {
            name: "fpm".into(),
            port: 9000,
            ..Server::default()
        };

        let mut docker = DockerSandbox {
            network_name: "rig".into(),
            container: ContainerSandbox {
                local: LocalSandbox::default(),
                image: ContainerImage {
                    name: "php".into(),
                    tag: "latest".into(),
                },
                ..ContainerSandbox::default()
            },
        };
        docker.container.local.common.available = true;

        let service = Service {
            server: ServiceServer {
                name: "fpm".into(),
                ..ServiceServer::default()
            },
            sandbox: "local".into(),
            ..Service::default()
        };
        let instance = Instance {
            name: "basic".into(),
            services: BTreeMap::from([("fpm".to_string(), service)]),
            actions: vec![
                Action::Start(StartAction {
                    service: "fpm".into(),
                    timeout: 50000,
                    ..StartAction::default()
                }),
                Action::OutputExpectation(OutputExpectationAction {
                    service: "fpm".into(),
                    output: OutputExpectation {
                        order: "fixed".into(),
                        match_mode: "exact".into(),
                        output_type: "stdout".into(),
                        messages: vec!["ready".into()],
                    },
                    ..OutputExpectationAction::default()
                }),
            ],
            timeout: 600000,
            ..Instance::default()
        };

        Config {
            version: "0.1".into(),
            name: "sample".into(),
            sandboxes: BTreeMap::from([("docker".to_string(), Sandbox::Docker(docker))]),
            servers: vec![nginx, fpm],
            spec: Spec {
                workspace: "/tmp/rig".into(),
                instances: vec![instance],
            },
            ..Config::default()
        }
    }
}
