use std::fmt;

use serde::Deserialize;

use crate::env_vars::EnvVars;


pub const DEFAULT_BUILD_IMAGE: &str = "dockerproxy.com/library/golang:1.20-buster";
pub const DEFAULT_RUNTIME_IMAGE: &str = "gcr.dockerproxy.com/distroless/static-debian11";
pub const DEFAULT_GO_PROXY_HOST: &str = "https://goproxy.cn,direct";


/// Package proxy used by the build stage.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GoProxyConfig {
    pub enabled: bool,
    pub host: String,
}


/// Images and optional steps of the generated `Dockerfile`.
///
/// This is also the `[docker]` table of the settings file. Unset images stay
/// empty until [`DockerConfig::with_defaults`] is applied at render time.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct DockerConfig {
    pub build_image: String,
    pub runtime_image: String,
    pub go_proxy: GoProxyConfig,

    /// Also copy the generated `openapi.json` into the runtime image.
    pub openapi: bool,
}

impl DockerConfig {
    /// Returns a copy with unset images (and the proxy host, when the proxy is enabled)
    /// replaced by their defaults.
    pub fn with_defaults(&self) -> Self {
        let mut config = self.clone();

        if config.build_image.is_empty() {
            config.build_image = DEFAULT_BUILD_IMAGE.to_string();
        }
        if config.runtime_image.is_empty() {
            config.runtime_image = DEFAULT_RUNTIME_IMAGE.to_string();
        }
        if config.go_proxy.enabled && config.go_proxy.host.is_empty() {
            config.go_proxy.host = DEFAULT_GO_PROXY_HOST.to_string();
        }

        config
    }
}


/// A single Dockerfile line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    From {
        image: String,
        alias: Option<String>,
    },
    Arg {
        name: String,
        default: Option<String>,
    },
    Env(Vec<(String, String)>),
    Workdir(String),
    Copy {
        from_stage: Option<String>,
        source: String,
        destination: String,
    },
    Run(String),
    Expose(String),
    Entrypoint(Vec<String>),
    Comment(String),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::From { image, alias } => match alias {
                Some(alias) => write!(f, "FROM {} AS {}", image, alias),
                None => write!(f, "FROM {}", image),
            },
            Instruction::Arg { name, default } => match default {
                Some(default) => write!(f, "ARG {}={}", name, default),
                None => write!(f, "ARG {}", name),
            },
            Instruction::Env(pairs) => {
                f.write_str("ENV")?;
                for (name, value) in pairs {
                    write!(f, " {}={}", name, value)?;
                }
                Ok(())
            }
            Instruction::Workdir(path) => write!(f, "WORKDIR {}", path),
            Instruction::Copy {
                from_stage,
                source,
                destination,
            } => match from_stage {
                Some(stage) => write!(f, "COPY --from={} {} {}", stage, source, destination),
                None => write!(f, "COPY {} {}", source, destination),
            },
            Instruction::Run(command) => write!(f, "RUN {}", command),
            Instruction::Expose(port) => write!(f, "EXPOSE {}", port),
            Instruction::Entrypoint(arguments) => {
                let quoted = arguments
                    .iter()
                    .map(|argument| format!("\"{}\"", argument))
                    .collect::<Vec<_>>();
                write!(f, "ENTRYPOINT [{}]", quoted.join(", "))
            }
            Instruction::Comment(text) => write!(f, "# {}", text),
        }
    }
}


/// Everything the template needs to know about the project being packaged.
#[derive(Debug, Clone, Copy)]
pub struct DockerfileContext<'a> {
    /// Last path segment of the project root.
    pub workspace: &'a str,

    /// Name of the binary inside the runtime image.
    pub command_name: &'a str,
}


/// A rendered-on-demand Dockerfile, kept as blocks of instructions.
/// Blocks are separated by an empty line when displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dockerfile {
    blocks: Vec<Vec<Instruction>>,
}

impl Dockerfile {
    /// Builds the two-stage Dockerfile.
    ///
    /// `docker_config` must already have its defaults applied.
    pub fn from_template(
        docker_config: &DockerConfig,
        context: DockerfileContext<'_>,
        env_vars: &EnvVars,
    ) -> Self {
        let workspace = context.workspace;
        let binary_path = format!("/go/bin/{}", context.command_name);

        let mut blocks = vec![
            vec![Instruction::From {
                image: docker_config.build_image.clone(),
                alias: Some("build-env".to_string()),
            }],
            vec![Instruction::From {
                image: "build-env".to_string(),
                alias: Some("builder".to_string()),
            }],
        ];

        if docker_config.go_proxy.enabled {
            blocks.push(vec![Instruction::Arg {
                name: "GOPROXY".to_string(),
                default: Some(docker_config.go_proxy.host.clone()),
            }]);
        }

        blocks.push(vec![
            Instruction::Workdir("/go/src".to_string()),
            Instruction::Copy {
                from_stage: None,
                source: "./".to_string(),
                destination: "./".to_string(),
            },
        ]);
        blocks.push(vec![
            Instruction::Comment("build".to_string()),
            Instruction::Run(format!("make build WORKSPACE={}", workspace)),
        ]);
        blocks.push(vec![
            Instruction::Comment("runtime".to_string()),
            Instruction::From {
                image: docker_config.runtime_image.clone(),
                alias: None,
            },
        ]);

        let mut copies = vec![Instruction::Copy {
            from_stage: Some("builder".to_string()),
            source: format!("/go/src/cmd/{0}/{0}", workspace),
            destination: binary_path.clone(),
        }];
        if docker_config.openapi {
            copies.push(Instruction::Copy {
                from_stage: Some("builder".to_string()),
                source: format!("/go/src/cmd/{}/openapi.json", workspace),
                destination: format!("/go/bin/cmd/{}/openapi.json", workspace),
            });
        }
        blocks.push(copies);

        let exposed_ports = env_vars
            .iter()
            .filter(|env_var| env_var.flags.expose && !env_var.value.is_empty())
            .map(|env_var| Instruction::Expose(env_var.value.clone()))
            .collect::<Vec<_>>();
        if !exposed_ports.is_empty() {
            blocks.push(exposed_ports);
        }

        blocks.push(vec![
            Instruction::Arg {
                name: "PROJECT_NAME".to_string(),
                default: None,
            },
            Instruction::Arg {
                name: "PROJECT_VERSION".to_string(),
                default: None,
            },
            Instruction::Env(vec![
                ("PROJECT_NAME".to_string(), "${PROJECT_NAME}".to_string()),
                ("PROJECT_VERSION".to_string(), "${PROJECT_VERSION}".to_string()),
            ]),
        ]);
        blocks.push(vec![
            Instruction::Workdir("/go/bin".to_string()),
            Instruction::Entrypoint(vec![binary_path]),
        ]);

        Self { blocks }
    }

    /// All instructions in file order.
    pub fn instructions(&self) -> impl Iterator<Item = &Instruction> {
        self.blocks.iter().flatten()
    }
}

impl fmt::Display for Dockerfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (block_index, block) in self.blocks.iter().enumerate() {
            if block_index > 0 {
                f.write_str("\n")?;
            }
            for instruction in block {
                writeln!(f, "{}", instruction)?;
            }
        }
        Ok(())
    }
}



#[cfg(test)]
mod tests {
    use super::*;
    use crate::env_vars::{EnvVar, EnvVarFlags};

    const CONTEXT: DockerfileContext<'static> = DockerfileContext {
        workspace: "srv-x",
        command_name: "srv-x",
    };

    fn exposed() -> EnvVarFlags {
        EnvVarFlags {
            expose: true,
            ..EnvVarFlags::default()
        }
    }

    #[test]
    fn defaults_are_applied_to_a_copy() {
        let config = DockerConfig {
            go_proxy: GoProxyConfig {
                enabled: true,
                host: String::new(),
            },
            ..DockerConfig::default()
        };

        let defaulted = config.with_defaults();
        assert_eq!(defaulted.build_image, DEFAULT_BUILD_IMAGE);
        assert_eq!(defaulted.runtime_image, DEFAULT_RUNTIME_IMAGE);
        assert_eq!(defaulted.go_proxy.host, DEFAULT_GO_PROXY_HOST);
        assert!(config.build_image.is_empty());
    }

    #[test]
    fn proxy_host_stays_empty_when_proxy_disabled() {
        let defaulted = DockerConfig::default().with_defaults();
        assert!(defaulted.go_proxy.host.is_empty());
    }

    #[test]
    fn renders_stages_in_order() {
        let mut env_vars = EnvVars::new("SRV_X");
        env_vars.set(EnvVar::new("PORT", "8080", exposed()));
        env_vars.set(EnvVar::new("METRICS_PORT", "", exposed()));
        env_vars.set(EnvVar::new("NAME", "x", EnvVarFlags::default()));

        let config = DockerConfig {
            build_image: "golang:1.21".to_string(),
            runtime_image: "distroless".to_string(),
            openapi: true,
            ..DockerConfig::default()
        };

        let dockerfile = Dockerfile::from_template(&config, CONTEXT, &env_vars);
        let expected = "\
FROM golang:1.21 AS build-env

FROM build-env AS builder

WORKDIR /go/src
COPY ./ ./

# build
RUN make build WORKSPACE=srv-x

# runtime
FROM distroless

COPY --from=builder /go/src/cmd/srv-x/srv-x /go/bin/srv-x
COPY --from=builder /go/src/cmd/srv-x/openapi.json /go/bin/cmd/srv-x/openapi.json

EXPOSE 8080

ARG PROJECT_NAME
ARG PROJECT_VERSION
ENV PROJECT_NAME=${PROJECT_NAME} PROJECT_VERSION=${PROJECT_VERSION}

WORKDIR /go/bin
ENTRYPOINT [\"/go/bin/srv-x\"]
";
        assert_eq!(dockerfile.to_string(), expected);
    }

    #[test]
    fn proxy_argument_follows_builder_stage() {
        let config = DockerConfig {
            go_proxy: GoProxyConfig {
                enabled: true,
                host: "https://proxy.example".to_string(),
            },
            ..DockerConfig::default()
        }
        .with_defaults();

        let dockerfile = Dockerfile::from_template(&config, CONTEXT, &EnvVars::new("SRV_X"));
        let instructions = dockerfile.instructions().collect::<Vec<_>>();

        assert_eq!(
            instructions[2],
            &Instruction::Arg {
                name: "GOPROXY".to_string(),
                default: Some("https://proxy.example".to_string()),
            }
        );
        assert!(!instructions
            .iter()
            .any(|instruction| matches!(instruction, Instruction::Expose(_))));
    }
}
