use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};

use crate::{
    client::{BasicAuth, ClientOptions, DEFAULT_REQUESTED_BY},
    output::OutputFormat,
    view::{DEFAULT_INSTANCE, DEFAULT_NAMESPACE, DEFAULT_VIEW, ViewLocation, ViewPathError},
};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "capsched",
    about = "Capacity-scheduler queue configuration client",
    version = crate::version::VERSION,
    disable_help_subcommand = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: Config,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the current configuration snapshot (default).
    Show,

    /// Print a historical configuration version.
    ShowTag(ShowTagArgs),

    /// List stored configuration versions.
    Tags,

    /// List the queue hierarchy of the current configuration.
    Queues,

    /// List cluster node labels.
    Labels,

    /// Print the caller's privilege descriptor.
    Privilege,

    /// Set or unset individual properties and submit the result.
    Set(SetArgs),

    /// Replace the whole configuration with a JSON object read from a file.
    Replace(ReplaceArgs),

    /// Add a child queue.
    AddQueue(AddQueueArgs),

    /// Remove a queue and everything below it.
    RemoveQueue(RemoveQueueArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ShowTagArgs {
    #[arg(long, value_name = "TAG")]
    pub tag: String,
}

#[derive(Args, Debug, Clone, Default)]
pub struct UpdateArgs {
    /// Version note stored with the new configuration.
    #[arg(long, value_name = "TEXT")]
    pub note: Option<String>,

    /// Endpoint suffix to activate once the update is accepted (e.g. saveAndRefresh).
    #[arg(long, value_name = "MARKER")]
    pub save_mark: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct SetArgs {
    #[arg(value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub pairs: Vec<(String, String)>,

    #[arg(long = "unset", value_name = "KEY")]
    pub unset: Vec<String>,

    #[command(flatten)]
    pub update: UpdateArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ReplaceArgs {
    #[arg(long, value_name = "PATH")]
    pub file: PathBuf,

    #[command(flatten)]
    pub update: UpdateArgs,
}

#[derive(Args, Debug, Clone)]
pub struct AddQueueArgs {
    #[arg(long, value_name = "PATH", default_value = "root")]
    pub parent: String,

    #[arg(long, value_name = "NAME")]
    pub name: String,

    #[command(flatten)]
    pub update: UpdateArgs,
}

#[derive(Args, Debug, Clone)]
pub struct RemoveQueueArgs {
    #[arg(long, value_name = "PATH")]
    pub path: String,

    #[command(flatten)]
    pub update: UpdateArgs,
}

#[derive(Args, Debug, Clone)]
pub struct Config {
    #[arg(
        long,
        global = true,
        env = "CAPSCHED_BASE_URL",
        value_name = "ORIGIN",
        default_value = "http://127.0.0.1:8080"
    )]
    pub base_url: String,

    #[arg(
        long,
        global = true,
        env = "CAPSCHED_NAMESPACE",
        value_name = "PATH",
        default_value = DEFAULT_NAMESPACE
    )]
    pub namespace: String,

    #[arg(
        long,
        global = true,
        env = "CAPSCHED_VIEW",
        value_name = "NAME",
        default_value = DEFAULT_VIEW
    )]
    pub view: String,

    #[arg(
        long = "view-version",
        global = true,
        env = "CAPSCHED_VIEW_VERSION",
        value_name = "VERSION",
        default_value = "1.0.0"
    )]
    pub view_version: String,

    #[arg(
        long,
        global = true,
        env = "CAPSCHED_INSTANCE",
        value_name = "NAME",
        default_value = DEFAULT_INSTANCE
    )]
    pub instance: String,

    /// Browser path of the view (e.g. /views/CAPACITY-SCHEDULER/1.0.0/cs/); overrides
    /// --view, --view-version and --instance.
    #[arg(long = "view-path", global = true, env = "CAPSCHED_VIEW_PATH", value_name = "PATH")]
    pub view_path: Option<String>,

    #[arg(
        long = "requested-by",
        global = true,
        env = "CAPSCHED_REQUESTED_BY",
        value_name = "NAME",
        default_value = DEFAULT_REQUESTED_BY
    )]
    pub requested_by: String,

    #[arg(long, global = true, env = "CAPSCHED_USER", value_name = "USER")]
    pub user: Option<String>,

    #[arg(
        long,
        global = true,
        env = "CAPSCHED_PASSWORD",
        value_name = "PASSWORD",
        hide_env_values = true
    )]
    pub password: Option<String>,

    #[arg(
        long = "connect-timeout-secs",
        global = true,
        env = "CAPSCHED_CONNECT_TIMEOUT_SECS",
        value_name = "SECS",
        default_value_t = 10,
        value_parser = clap::value_parser!(u64).range(1..=120)
    )]
    pub connect_timeout_secs: u64,

    #[arg(
        long,
        global = true,
        env = "CAPSCHED_FORMAT",
        value_name = "FORMAT",
        default_value = "json",
        value_enum
    )]
    pub format: OutputFormat,
}

impl Config {
    pub fn view_location(&self) -> Result<ViewLocation, ViewPathError> {
        if let Some(path) = self.view_path.as_deref() {
            let mut loc = ViewLocation::from_browser_path(path)?;
            loc.namespace = self.namespace.clone();
            return Ok(loc);
        }
        Ok(ViewLocation::new(
            self.namespace.clone(),
            self.view.clone(),
            self.view_version.clone(),
            self.instance.clone(),
        ))
    }

    pub fn client_options(&self) -> Result<ClientOptions, ViewPathError> {
        let mut options = ClientOptions::new(self.view_location()?.base_url(&self.base_url));
        options.requested_by = self.requested_by.clone();
        options.connect_timeout = Duration::from_secs(self.connect_timeout_secs);
        options.basic_auth = self.user.clone().map(|user| BasicAuth {
            user,
            password: self.password.clone(),
        });
        Ok(options)
    }
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {s:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty key in {s:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_flags_absent() {
        let cli = Cli::try_parse_from(["capsched"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.config.base_url, "http://127.0.0.1:8080");
        assert_eq!(cli.config.namespace, "api/v1");
        assert_eq!(cli.config.view, "CAPACITY-SCHEDULER");
        assert_eq!(cli.config.view_version, "1.0.0");
        assert_eq!(cli.config.instance, "AUTO_CS_INSTANCE");
        assert_eq!(cli.config.requested_by, "view-capacity-scheduler");
        assert_eq!(cli.config.connect_timeout_secs, 10);
        assert_eq!(cli.config.format, OutputFormat::Json);
        assert!(cli.config.user.is_none());
    }

    #[test]
    fn rejects_invalid_connect_timeout_secs() {
        let err = Cli::try_parse_from(["capsched", "--connect-timeout-secs", "0"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("--connect-timeout-secs"));
        assert!(msg.contains("1..=120"));
    }

    #[test]
    fn parses_set_pairs_and_update_flags() {
        let cli = Cli::try_parse_from([
            "capsched",
            "set",
            "yarn.scheduler.capacity.root.default.capacity=50",
            "a=b=c",
            "--unset",
            "old.key",
            "--note",
            "tune",
            "--save-mark",
            "saveAndRefresh",
        ])
        .unwrap();
        let Some(Command::Set(args)) = cli.command else {
            panic!("expected set command");
        };
        assert_eq!(
            args.pairs,
            vec![
                (
                    "yarn.scheduler.capacity.root.default.capacity".to_string(),
                    "50".to_string()
                ),
                ("a".to_string(), "b=c".to_string()),
            ]
        );
        assert_eq!(args.unset, vec!["old.key".to_string()]);
        assert_eq!(args.update.note.as_deref(), Some("tune"));
        assert_eq!(args.update.save_mark.as_deref(), Some("saveAndRefresh"));
    }

    #[test]
    fn rejects_pairs_without_equals() {
        let err = Cli::try_parse_from(["capsched", "set", "novalue"]).unwrap_err();
        assert!(err.to_string().contains("expected KEY=VALUE"));
    }

    #[test]
    fn view_path_overrides_view_flags() {
        let cli = Cli::try_parse_from([
            "capsched",
            "--base-url",
            "http://ambari:8080/",
            "--view-path",
            "/views/CAPACITY-SCHEDULER/cs2",
        ])
        .unwrap();
        let options = cli.config.client_options().unwrap();
        assert_eq!(
            options.base_url,
            "http://ambari:8080/api/v1/views/CAPACITY-SCHEDULER/versions//instances/cs2/resources/scheduler/configuration"
        );
    }

    #[test]
    fn basic_auth_only_with_user() {
        let cli = Cli::try_parse_from(["capsched", "--password", "secret"]).unwrap();
        assert!(cli.config.client_options().unwrap().basic_auth.is_none());

        let cli =
            Cli::try_parse_from(["capsched", "--user", "admin", "--password", "secret"]).unwrap();
        let auth = cli.config.client_options().unwrap().basic_auth.unwrap();
        assert_eq!(auth.user, "admin");
        assert_eq!(auth.password.as_deref(), Some("secret"));
    }
}
