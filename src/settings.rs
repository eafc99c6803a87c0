use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use serde::Deserialize;
use teloxide::types::UserId;

const DEFAULT_SUPPORT_USERNAME: &str = "@shihab98bc";

/// Telegram bot handing out numbers, collecting spreadsheets and running an admin panel.
#[derive(Parser, Debug, Clone)]
#[command(version, about)]
pub struct Args {
    /// Bot API token
    #[arg(long, env = "BOT_TOKEN", hide_env_values = true)]
    pub bot_token: Option<String>,

    /// Comma separated ids of the users allowed into the admin panel
    #[arg(long, env = "ADMIN_IDS", value_delimiter = ',', value_parser = parse_user_id)]
    pub admin_ids: Vec<u64>,

    /// Contact shown by the Support button
    #[arg(long, env = "SUPPORT_USERNAME")]
    pub support_username: Option<String>,

    /// Fallback config read when some of the values above are missing
    #[arg(long, env = "CONFIG_FILE", default_value = "config.json")]
    pub config_file: PathBuf,

    #[arg(long, env = "DATA_FILE", default_value = "data.json")]
    pub data_file: PathBuf,

    /// Number pools and user submissions live here
    #[arg(long, env = "UPLOADS_DIR", default_value = "uploads")]
    pub uploads_dir: PathBuf,

    /// Seconds every user has to wait after anyone took a number
    #[arg(long, env = "NUMBER_COOLDOWN_SECS", default_value_t = 10)]
    pub cooldown_secs: u64,

    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

fn parse_user_id(s: &str) -> Result<u64, String> {
    s.trim().parse().map_err(|_| format!("'{}' is not a user id", s))
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    #[serde(rename = "BOT_TOKEN")]
    bot_token: Option<String>,
    #[serde(rename = "ADMIN_IDS")]
    admin_ids: Option<Vec<u64>>,
    #[serde(rename = "SUPPORT_USERNAME")]
    support_username: Option<String>,
}

impl FileConfig {
    fn read(path: &Path) -> anyhow::Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("{} not found and environment variables not set", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("cannot parse {}", path.display()))
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub bot_token: String,
    pub admin_ids: Vec<UserId>,
    pub support_username: String,
    pub data_file: PathBuf,
    pub uploads_dir: PathBuf,
    pub cooldown: Duration,
}

impl Settings {
    pub fn resolve(args: &Args) -> anyhow::Result<Self> {
        let complete = args.bot_token.is_some() && !args.admin_ids.is_empty() && args.support_username.is_some();
        let file = if complete {
            FileConfig::default()
        } else {
            FileConfig::read(&args.config_file)?
        };
        Self::merge(args, file)
    }

    fn merge(args: &Args, file: FileConfig) -> anyhow::Result<Self> {
        let Some(bot_token) = args.bot_token.clone().or(file.bot_token).filter(|t| !t.is_empty()) else {
            bail!("BOT_TOKEN is not set");
        };
        let admin_ids = if args.admin_ids.is_empty() {
            file.admin_ids.unwrap_or_default()
        } else {
            args.admin_ids.clone()
        };
        if admin_ids.is_empty() {
            bail!("ADMIN_IDS is not set");
        }
        let support_username = args
            .support_username
            .clone()
            .or(file.support_username)
            .unwrap_or_else(|| DEFAULT_SUPPORT_USERNAME.to_owned());
        Ok(Self {
            bot_token,
            admin_ids: admin_ids.into_iter().map(UserId).collect(),
            support_username,
            data_file: args.data_file.clone(),
            uploads_dir: args.uploads_dir.clone(),
            cooldown: Duration::from_secs(args.cooldown_secs),
        })
    }

    pub fn is_admin(&self, user_id: UserId) -> bool {
        self.admin_ids.contains(&user_id)
    }

    pub fn user_files_dir(&self) -> PathBuf {
        self.uploads_dir.join("user_files")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Args {
        let mut argv = vec!["numbers-bot"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn admin_ids_are_split_and_trimmed() {
        let args = args(&["--bot-token", "t", "--admin-ids", "1, 22,333", "--support-username", "@help"]);
        assert_eq!(args.admin_ids, vec![1, 22, 333]);
        let settings = Settings::resolve(&args).unwrap();
        assert!(settings.is_admin(UserId(22)));
        assert!(!settings.is_admin(UserId(4)));
        assert_eq!(settings.cooldown, Duration::from_secs(10));
    }

    #[test]
    fn bad_admin_id_is_rejected() {
        let res = Args::try_parse_from(["numbers-bot", "--admin-ids", "1,abc"]);
        assert!(res.is_err());
    }

    #[test]
    fn missing_values_come_from_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"BOT_TOKEN": "from-file", "ADMIN_IDS": [5, 6]}"#).unwrap();
        let config = path.to_str().unwrap();
        let settings = Settings::resolve(&args(&["--config-file", config, "--admin-ids", "9"])).unwrap();
        assert_eq!(settings.bot_token, "from-file");
        assert_eq!(settings.admin_ids, vec![UserId(9)]);
        assert_eq!(settings.support_username, DEFAULT_SUPPORT_USERNAME);
    }

    #[test]
    fn missing_file_and_values_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("absent.json");
        let res = Settings::resolve(&args(&["--config-file", config.to_str().unwrap()]));
        assert!(res.is_err());
    }

    #[test]
    fn token_is_required() {
        let file = FileConfig { admin_ids: Some(vec![1]), ..Default::default() };
        assert!(Settings::merge(&args(&[]), file).is_err());
    }
}
