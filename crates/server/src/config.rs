use anyhow::{anyhow, Context};
use config::ConfigError;
use domain::{Post, PostId, User, UserId};
use serde::Deserialize;
use std::collections::HashMap;

const ENV_PREFIX: &str = "COMMENTCAST_";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub stream: StreamSettings,
    pub comments: CommentSettings,
    pub mail: MailSettings,
    #[serde(default)]
    pub seed: SeedSettings,
}

#[derive(Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub cors_origins: String,
}

#[derive(Deserialize, Clone)]
pub struct DatabaseSettings {
    /// `sqlite://...` or `memory://` for the in-process store.
    pub url: String,
}

#[derive(Deserialize, Clone)]
pub struct StreamSettings {
    pub sink_capacity: usize,
    pub keep_alive_secs: u64,
}

#[derive(Deserialize, Clone)]
pub struct CommentSettings {
    pub max_length: usize,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MailMode {
    Log,
    Http,
}

#[derive(Deserialize, Clone)]
pub struct MailSettings {
    pub mode: MailMode,
    pub endpoint: Option<String>,
    pub from: String,
    pub queue_capacity: usize,
}

impl MailSettings {
    pub fn to_mail_config(&self) -> anyhow::Result<mailer::MailConfig> {
        match self.mode {
            MailMode::Log => Ok(mailer::MailConfig::Log),
            MailMode::Http => {
                let endpoint = self
                    .endpoint
                    .clone()
                    .filter(|e| !e.trim().is_empty())
                    .ok_or_else(|| anyhow!("mail.endpoint is required when mail.mode = \"http\""))?;
                Ok(mailer::MailConfig::Http(mailer::HttpMailerConfig {
                    endpoint,
                    from: self.from.clone(),
                }))
            }
        }
    }
}

/// Posts and users written into the store at startup. They normally come
/// from the CMS; seeding makes a standalone or `memory://` server usable.
#[derive(Deserialize, Clone, Default)]
pub struct SeedSettings {
    #[serde(default)]
    pub posts: Vec<SeedPost>,
    #[serde(default)]
    pub users: Vec<SeedUser>,
}

#[derive(Deserialize, Clone)]
pub struct SeedPost {
    pub id: String,
    pub author_id: String,
    pub title: String,
}

#[derive(Deserialize, Clone)]
pub struct SeedUser {
    pub id: String,
    pub display_name: String,
    pub email: Option<String>,
}

impl SeedSettings {
    pub fn posts(&self) -> anyhow::Result<Vec<Post>> {
        self.posts
            .iter()
            .map(|p| -> anyhow::Result<Post> {
                Ok(Post {
                    id: PostId::new(p.id.as_str()).map_err(|e| anyhow!(e))?,
                    author_id: UserId::new(p.author_id.as_str()).map_err(|e| anyhow!(e))?,
                    title: p.title.clone(),
                })
            })
            .collect::<anyhow::Result<_>>()
            .context("Invalid seed.posts entry")
    }

    pub fn users(&self) -> anyhow::Result<Vec<User>> {
        self.users
            .iter()
            .map(|u| -> anyhow::Result<User> {
                Ok(User {
                    id: UserId::new(u.id.as_str()).map_err(|e| anyhow!(e))?,
                    display_name: u.display_name.clone(),
                    email: u.email.clone().filter(|e| !e.trim().is_empty()),
                })
            })
            .collect::<anyhow::Result<_>>()
            .context("Invalid seed.users entry")
    }
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        let env_map = collect_env_vars();

        let s = config::Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("server.cors_origins", "*")?
            .set_default("database.url", "sqlite://data/commentcast.db")?
            .set_default("stream.sink_capacity", 64)?
            .set_default("stream.keep_alive_secs", 15)?
            .set_default("comments.max_length", 10_000)?
            .set_default("mail.mode", "log")?
            .set_default("mail.from", "noreply@localhost")?
            .set_default("mail.queue_capacity", 256)?
            .add_source(config::File::with_name("config").required(false))
            .add_source(config::File::with_name(&format!("config.{}", run_mode)).required(false))
            .add_source(config::File::from_str(
                &serde_json::to_string(&env_map)
                    .map_err(|e| ConfigError::Foreign(Box::new(e)))?,
                config::FileFormat::Json,
            ))
            .build()?;

        s.try_deserialize()
    }
}

/// `COMMENTCAST_SERVER__PORT=8080` becomes `server.port = "8080"`.
fn collect_env_vars() -> HashMap<String, String> {
    env_overrides(std::env::vars())
}

fn env_overrides(vars: impl Iterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.filter(|(k, _)| k.starts_with(ENV_PREFIX))
        .map(|(k, v)| {
            let new_key = k
                .trim_start_matches(ENV_PREFIX)
                .replace("__", ".")
                .to_lowercase();
            (new_key, v)
        })
        .collect()
}
