//! The per-process configuration context and the layered resolution engine.
//!
//! Values are resolved in three passes, each overriding the previous one:
//!
//! 1. struct defaults (synced both ways with the registry),
//! 2. the optional `config/local.yml` override file,
//! 3. `<PREFIX>_<KEY>` variables from the process environment.

use std::{
    collections::BTreeMap,
    env,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    artifacts::{
        self,
        DockerConfig,
        Dockerfile,
        DockerfileContext,
        GeneratedArtifacts,
        DEFAULT_VALUES_FILE_PATH,
        DOCKERFILE_PATH,
    },
    env_vars::{EnvVar, EnvVars},
    error::{ConfxError, SourceKind},
    field::{Conf, Field},
    settings::Settings,
};

mod sources;

pub use sources::LOCAL_OVERRIDE_FILE_PATH;


/// Service name used when none is given.
pub const DEFAULT_SERVICE_NAME: &str = "srv-x";

/// Unprefixed variable selecting a feature build; it suffixes the project name.
pub const PROJECT_FEATURE_ENV_VAR: &str = "PROJECT_FEATURE";

/// Exported by [`Configuration::resolve`] so child processes and the
/// Dockerfile metadata can pick up the project name.
pub const PROJECT_NAME_ENV_VAR: &str = "PROJECT_NAME";


/// Everything needed to resolve a service's configuration and to generate its artifacts.
///
/// Construct one at start-up and pass it by reference to whatever needs it.
/// Every [`resolve`][Configuration::resolve] call accumulates into the same registry.
#[derive(Debug, Clone)]
pub struct Configuration {
    service_name: String,
    feature: Option<String>,
    project_root: PathBuf,
    output_directory: PathBuf,
    docker_config: DockerConfig,

    /// Whether [`Configuration::generate_if_requested`] writes artifacts.
    pub should_generate_config: bool,

    env_vars: EnvVars,
}

impl Configuration {
    /// Creates a configuration for `service_name` rooted at `project_root`.
    /// Artifacts are written to the project root unless
    /// [`with_output_directory`][Configuration::with_output_directory] says otherwise.
    pub fn new<S, P>(service_name: S, project_root: P) -> Self
    where
        S: Into<String>,
        P: Into<PathBuf>,
    {
        let mut service_name: String = service_name.into();
        if service_name.is_empty() {
            service_name = DEFAULT_SERVICE_NAME.to_string();
        }

        let project_root: PathBuf = project_root.into();
        let env_vars = EnvVars::new(prefix_for(&service_name));

        Self {
            service_name,
            feature: None,
            output_directory: project_root.clone(),
            project_root,
            docker_config: DockerConfig::default(),
            should_generate_config: true,
            env_vars,
        }
    }

    /// Creates a configuration using the paths and docker settings of `settings`.
    pub fn from_settings<S: Into<String>>(service_name: S, settings: &Settings) -> Self {
        Self::new(service_name, settings.paths.project_root_path.clone())
            .with_output_directory(settings.paths.output_directory_path.clone())
            .with_docker_config(settings.docker.clone())
    }

    #[must_use]
    pub fn with_output_directory<P: Into<PathBuf>>(mut self, output_directory: P) -> Self {
        self.output_directory = output_directory.into();
        self
    }

    #[must_use]
    pub fn with_docker_config(mut self, docker_config: DockerConfig) -> Self {
        self.docker_config = docker_config;
        self
    }

    /// Sets the feature suffix. An empty feature clears it.
    #[must_use]
    pub fn with_feature<S: Into<String>>(mut self, feature: S) -> Self {
        let feature: String = feature.into();
        self.feature = if feature.is_empty() {
            None
        } else {
            Some(feature)
        };
        self
    }

    /// Picks up the feature from `PROJECT_FEATURE`, if set.
    #[must_use]
    pub fn initialize_from_env(self) -> Self {
        match env::var(PROJECT_FEATURE_ENV_VAR) {
            Ok(feature) => self.with_feature(feature),
            Err(_) => self,
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn feature(&self) -> Option<&str> {
        self.feature.as_deref()
    }

    /// `<service>` or, with a feature, `<service>--<feature>`.
    pub fn project_name(&self) -> String {
        match &self.feature {
            Some(feature) => format!("{}--{}", self.service_name, feature),
            None => self.service_name.clone(),
        }
    }

    /// Uppercased service name with `-` replaced by `_`, e.g. `srv-x` becomes `SRV_X`.
    pub fn prefix(&self) -> String {
        prefix_for(&self.service_name)
    }

    /// Last path segment of the canonicalized project root, so `.` names the
    /// current directory. A root that does not exist is used as given. When
    /// there is no segment at all (`/`), the service name is used instead.
    pub fn workspace(&self) -> String {
        let project_root = dunce::canonicalize(&self.project_root)
            .unwrap_or_else(|_| self.project_root.clone());

        project_root
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.service_name.clone())
    }

    /// Route root of the service, `/<service>`.
    pub fn root_path(&self) -> String {
        format!("/{}", self.service_name)
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn docker_config(&self) -> &DockerConfig {
        &self.docker_config
    }

    /// Values applied by every resolution so far, keyed without prefix.
    pub fn env_vars(&self) -> &EnvVars {
        &self.env_vars
    }

    /// Resolves `target` against its defaults, the local override file and the
    /// process environment, then prints the masked report to stdout and runs
    /// field init hooks.
    ///
    /// Also exports `PROJECT_NAME` into the process environment.
    ///
    /// `target` must be passed by mutable reference:
    ///
    /// ```compile_fail
    /// use confx::{impl_conf, Configuration};
    ///
    /// #[derive(Default)]
    /// struct Server {
    ///     port: u16,
    /// }
    ///
    /// impl_conf!(Server {
    ///     port => "PORT";
    /// });
    ///
    /// let mut configuration = Configuration::new("srv-x", ".");
    /// configuration.resolve(Server::default()).unwrap();
    /// ```
    pub fn resolve<C>(&mut self, target: &mut C) -> Result<(), ConfxError>
    where
        C: Conf + ?Sized,
    {
        env::set_var(PROJECT_NAME_ENV_VAR, self.project_name());

        let environ = env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        });

        self.resolve_with_environ(target, environ)
    }

    /// Same as [`resolve`][Configuration::resolve], but reads environment
    /// variables from `environ` instead of the process environment.
    pub fn resolve_with_environ<C, I, K, V>(
        &mut self,
        target: &mut C,
        environ: I,
    ) -> Result<(), ConfxError>
    where
        C: Conf + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let prefix = self.prefix();

        debug!(%prefix, "Applying struct defaults.");
        decode_fields(target, &self.env_vars, SourceKind::Defaults)?;
        encode_fields(target, &mut self.env_vars);

        if let Some(overrides) = sources::read_local_overrides(&self.project_root, &prefix) {
            debug!(%prefix, entries = overrides.len(), "Applying local overrides.");
            decode_fields_leniently(target, &overrides);
        }

        let environment = EnvVars::from_environ(&prefix, environ);
        debug!(%prefix, entries = environment.len(), "Applying process environment.");
        decode_fields(target, &environment, SourceKind::Environment)?;
        ensure_required_fields(target, &prefix)?;
        encode_fields(target, &mut self.env_vars);

        print!("{}", String::from_utf8_lossy(&self.report(target)));

        run_init_hooks(target);
        Ok(())
    }

    /// Renders `target` as `<PREFIX>_<KEY>=<value>` lines, with secrets masked.
    pub fn report<C>(&self, target: &mut C) -> Vec<u8>
    where
        C: Conf + ?Sized,
    {
        let mut report_env_vars = EnvVars::new(self.prefix());
        encode_fields(target, &mut report_env_vars);
        report_env_vars.mask_bytes()
    }

    /// Contents of `config/default.yml`: every non-optional entry, keyed `<PREFIX>_<KEY>`.
    pub fn default_config(&self) -> BTreeMap<String, String> {
        artifacts::default_values(&self.env_vars)
    }

    /// The Dockerfile for the current registry, with image defaults applied.
    pub fn dockerfile(&self) -> Dockerfile {
        let docker_config = self.docker_config.with_defaults();
        let workspace = self.workspace();

        Dockerfile::from_template(
            &docker_config,
            DockerfileContext {
                workspace: &workspace,
                command_name: &self.service_name,
            },
            &self.env_vars,
        )
    }

    /// Writes `config/default.yml` and `Dockerfile` into the output directory,
    /// overwriting previous output.
    pub fn dockerize(&self) -> Result<GeneratedArtifacts, ConfxError> {
        let default_values_file_path = self.output_directory.join(DEFAULT_VALUES_FILE_PATH);
        artifacts::write_default_values(&default_values_file_path, &self.default_config())?;

        let dockerfile_path = self.output_directory.join(DOCKERFILE_PATH);
        artifacts::write_dockerfile(&dockerfile_path, &self.dockerfile())?;

        Ok(GeneratedArtifacts {
            default_values_file_path,
            dockerfile_path,
        })
    }

    /// Runs [`dockerize`][Configuration::dockerize] if
    /// [`should_generate_config`][Configuration::should_generate_config] is set.
    pub fn generate_if_requested(&self) -> Result<Option<GeneratedArtifacts>, ConfxError> {
        if self.should_generate_config {
            self.dockerize().map(Some)
        } else {
            Ok(None)
        }
    }
}


fn prefix_for(service_name: &str) -> String {
    service_name.replace('-', "_").to_uppercase()
}

fn decode_fields<C>(target: &mut C, source: &EnvVars, origin: SourceKind) -> Result<(), ConfxError>
where
    C: Conf + ?Sized,
{
    for Field { key, flags, value } in target.fields() {
        if let Some(env_var) = source.get_var(key) {
            if flags.optional && env_var.value.is_empty() {
                continue;
            }

            value
                .decode(&env_var.value)
                .map_err(|error| ConfxError::Decode {
                    key: env_var.key_with(source.prefix()),
                    origin,
                    reason: error.to_string(),
                })?;
        }
    }

    Ok(())
}

/// Like [`decode_fields`], but logs and skips values that fail to decode.
fn decode_fields_leniently<C>(target: &mut C, source: &EnvVars)
where
    C: Conf + ?Sized,
{
    for Field { key, flags, value } in target.fields() {
        let Some(env_var) = source.get_var(key) else {
            continue;
        };
        if flags.optional && env_var.value.is_empty() {
            continue;
        }

        if let Err(error) = value.decode(&env_var.value) {
            let error = ConfxError::Decode {
                key: env_var.key_with(source.prefix()),
                origin: SourceKind::LocalOverride,
                reason: error.to_string(),
            };
            warn!(%error, "Ignoring invalid value from local override file.");
        }
    }
}

/// Fails on the first field that is not `optional` and still encodes to an empty value.
fn ensure_required_fields<C>(target: &mut C, prefix: &str) -> Result<(), ConfxError>
where
    C: Conf + ?Sized,
{
    for Field { key, flags, value } in target.fields() {
        let env_var = EnvVar::new(key, value.encode(), flags);
        if !env_var.flags.optional && env_var.value.is_empty() {
            return Err(ConfxError::Missing {
                key: env_var.key_with(prefix),
            });
        }
    }

    Ok(())
}

fn encode_fields<C>(target: &mut C, env_vars: &mut EnvVars)
where
    C: Conf + ?Sized,
{
    for Field { key, flags, value } in target.fields() {
        env_vars.set(EnvVar::new(key, value.encode(), flags));
    }
}

fn run_init_hooks<C>(target: &mut C)
where
    C: Conf + ?Sized,
{
    for Field { value, .. } in target.fields() {
        if let Some(hook) = value.as_init() {
            hook.init();
        }
    }
}



#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::{env_vars::MASK, field::EnvValue, field::Init, field::ValueError, impl_conf};

    #[derive(Default)]
    struct Endpoint {
        url: String,
        ready: bool,
    }

    impl EnvValue for Endpoint {
        fn encode(&self) -> String {
            self.url.clone()
        }

        fn decode(&mut self, raw: &str) -> Result<(), ValueError> {
            raw.clone_into(&mut self.url);
            Ok(())
        }

        fn as_init(&mut self) -> Option<&mut dyn Init> {
            Some(self)
        }
    }

    impl Init for Endpoint {
        fn init(&mut self) {
            self.ready = !self.url.is_empty();
        }
    }

    struct Server {
        port: u16,
        password: String,
        debug: Option<bool>,
        upstream: Endpoint,
    }

    impl Default for Server {
        fn default() -> Self {
            Self {
                port: 80,
                password: "default-password".to_string(),
                debug: None,
                upstream: Endpoint::default(),
            }
        }
    }

    impl_conf!(Server {
        port => "PORT", expose;
        password => "PASSWORD", secret;
        debug => "DEBUG", optional;
        upstream => "UPSTREAM", optional;
    });

    #[derive(Default)]
    struct Database {
        url: String,
        port: u16,
        label: String,
        pool_limit: u16,
    }

    impl_conf!(Database {
        url => "URL";
        port => "PORT";
        label => "LABEL", optional;
        pool_limit => "POOL_LIMIT", optional;
    });

    fn configuration() -> (tempfile::TempDir, Configuration) {
        let directory = tempfile::tempdir().unwrap();
        let configuration = Configuration::new("srv-x", directory.path());
        (directory, configuration)
    }

    #[test]
    fn names_derive_from_service_and_feature() {
        let configuration = Configuration::new("srv-x", "/work/srv-x-project");
        assert_eq!(configuration.prefix(), "SRV_X");
        assert_eq!(configuration.project_name(), "srv-x");
        assert_eq!(configuration.workspace(), "srv-x-project");
        assert_eq!(configuration.root_path(), "/srv-x");

        let configuration = configuration.with_feature("demo");
        assert_eq!(configuration.project_name(), "srv-x--demo");
        assert_eq!(configuration.with_feature("").feature(), None);
    }

    #[test]
    fn workspace_of_relative_root_names_the_directory() {
        let current_directory = env::current_dir().unwrap();
        let expected = current_directory
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();

        assert_eq!(Configuration::new("srv-x", ".").workspace(), expected);
        assert_eq!(Configuration::new("srv-x", "/").workspace(), "srv-x");
    }

    #[test]
    fn empty_service_name_falls_back_to_default() {
        let configuration = Configuration::new("", "/work/app");
        assert_eq!(configuration.service_name(), DEFAULT_SERVICE_NAME);
        assert_eq!(configuration.prefix(), "SRV_X");
    }

    #[test]
    fn struct_defaults_survive_without_sources() {
        let (_directory, mut configuration) = configuration();
        let mut server = Server::default();

        configuration
            .resolve_with_environ(&mut server, Vec::<(String, String)>::new())
            .unwrap();

        assert_eq!(server.port, 80);
        assert_eq!(configuration.env_vars().get("PORT"), Some("80"));
        assert_eq!(configuration.env_vars().get("DEBUG"), Some(""));
    }

    #[test]
    fn environment_overrides_defaults_and_is_recorded() {
        let (_directory, mut configuration) = configuration();
        let mut server = Server::default();

        configuration
            .resolve_with_environ(
                &mut server,
                vec![("SRV_X_PORT", "8080"), ("SRV_X_DEBUG", "true"), ("OTHER_PORT", "1")],
            )
            .unwrap();

        assert_eq!(server.port, 8080);
        assert_eq!(server.debug, Some(true));

        let port = configuration.env_vars().get_var("PORT").unwrap();
        assert_eq!(port.value, "8080");
        assert!(port.flags.expose);
    }

    #[test]
    fn malformed_environment_value_is_fatal() {
        let (_directory, mut configuration) = configuration();
        let mut server = Server::default();

        let error = configuration
            .resolve_with_environ(&mut server, vec![("SRV_X_PORT", "http")])
            .unwrap_err();

        match error {
            ConfxError::Decode { key, origin, .. } => {
                assert_eq!(key, "SRV_X_PORT");
                assert_eq!(origin, SourceKind::Environment);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_value_absent_everywhere_is_fatal() {
        let (_directory, mut configuration) = configuration();
        let mut database = Database::default();

        let error = configuration
            .resolve_with_environ(&mut database, Vec::<(String, String)>::new())
            .unwrap_err();

        match error {
            ConfxError::Missing { key } => assert_eq!(key, "SRV_X_URL"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_value_emptied_by_environment_is_fatal() {
        let (_directory, mut configuration) = configuration();
        let mut server = Server::default();

        let error = configuration
            .resolve_with_environ(&mut server, vec![("SRV_X_PASSWORD", "")])
            .unwrap_err();

        assert!(matches!(error, ConfxError::Missing { key } if key == "SRV_X_PASSWORD"));
    }

    #[test]
    fn optional_values_may_be_absent_or_empty() {
        let (_directory, mut configuration) = configuration();
        let mut database = Database {
            pool_limit: 16,
            ..Database::default()
        };

        configuration
            .resolve_with_environ(
                &mut database,
                vec![("SRV_X_URL", "postgres://db"), ("SRV_X_POOL_LIMIT", "")],
            )
            .unwrap();

        assert_eq!(database.url, "postgres://db");
        assert_eq!(database.label, "");
        assert_eq!(database.pool_limit, 16);
        assert_eq!(configuration.env_vars().get("LABEL"), Some(""));
    }

    #[test]
    fn empty_optional_override_value_is_ignored() {
        let (directory, mut configuration) = configuration();
        fs::create_dir_all(directory.path().join("config")).unwrap();
        fs::write(
            directory.path().join(LOCAL_OVERRIDE_FILE_PATH),
            "URL: postgres://db\nPOOL_LIMIT: \"\"\nPORT: not-a-port\n",
        )
        .unwrap();

        let mut database = Database {
            port: 5432,
            pool_limit: 4,
            ..Database::default()
        };
        configuration
            .resolve_with_environ(&mut database, Vec::<(String, String)>::new())
            .unwrap();

        assert_eq!(database.url, "postgres://db");
        assert_eq!(database.pool_limit, 4);
        assert_eq!(database.port, 5432);
    }

    #[test]
    fn registry_values_back_fill_later_structs() {
        let (_directory, mut configuration) = configuration();

        let mut first = Server::default();
        configuration
            .resolve_with_environ(&mut first, vec![("SRV_X_PASSWORD", "from-env")])
            .unwrap();

        let mut second = Server::default();
        configuration
            .resolve_with_environ(&mut second, Vec::<(String, String)>::new())
            .unwrap();

        assert_eq!(second.password, "from-env");
    }

    #[test]
    fn report_masks_secrets() {
        let (_directory, configuration) = configuration();
        let mut server = Server {
            password: "hunter2".to_string(),
            ..Server::default()
        };

        let report = String::from_utf8(configuration.report(&mut server)).unwrap();
        assert!(report.contains("SRV_X_PORT=80\n"));
        assert!(report.contains(&format!("SRV_X_PASSWORD={}\n", MASK)));
        assert!(!report.contains("hunter2"));
    }

    #[test]
    fn init_hooks_run_after_resolution() {
        let (_directory, mut configuration) = configuration();
        let mut server = Server::default();

        configuration
            .resolve_with_environ(&mut server, vec![("SRV_X_UPSTREAM", "http://upstream")])
            .unwrap();

        assert_eq!(server.upstream.url, "http://upstream");
        assert!(server.upstream.ready);
    }

    #[test]
    fn generation_is_skipped_when_not_requested() {
        let (_directory, mut configuration) = configuration();
        configuration.should_generate_config = false;

        assert_eq!(configuration.generate_if_requested().unwrap(), None);
        assert!(!configuration.output_directory().join(DOCKERFILE_PATH).exists());
    }
}
