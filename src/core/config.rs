use std::{env, fmt, fs, io, path::Path, str::FromStr, time::Duration};

use thiserror::Error;

pub const DEFAULT_SECRETS_PATH: &str = ".streamlit/secrets.toml";

/// Sessions untouched for this long are dropped
pub const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing API credential. Set {0} in the environment or in the secrets file")]
    MissingCredential(&'static str),
    #[error("Failed to read secrets file {path}: {source}")]
    SecretsRead {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid secrets file {path}: {source}")]
    SecretsParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Invalid value `{value}` for {key}")]
    InvalidSetting { key: &'static str, value: String },
    #[error("Unknown provider `{0}`, expected `gemini` or `openai`")]
    UnknownProvider(String),
    #[error("Failed to initialize the model client: {0}")]
    ClientInit(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Provider {
    Gemini,
    OpenAi,
}

impl Provider {
    /// Name of the variable holding the credential, both in the
    /// environment and in the secrets file.
    pub fn credential_var(&self) -> &'static str {
        match self {
            Provider::Gemini => "GOOGLE_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::Gemini => "gemini-1.5-flash",
            Provider::OpenAi => "gpt-4.1-mini",
        }
    }

    pub fn default_api_hostname(&self) -> &'static str {
        match self {
            Provider::Gemini => "https://generativelanguage.googleapis.com",
            Provider::OpenAi => "https://api.openai.com",
        }
    }
}

impl FromStr for Provider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Provider::Gemini),
            "openai" => Ok(Provider::OpenAi),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Provider::Gemini => write!(f, "gemini"),
            Provider::OpenAi => write!(f, "openai"),
        }
    }
}

/// Process wide configuration. Built once before any session exists
/// and never mutated afterwards.
#[derive(Clone)]
pub struct AppConfig {
    pub provider: Provider,
    pub api_key: String,
    pub api_hostname: String,
    pub model: String,
    pub system_message: Option<String>,
    pub page_title: String,
    pub assistant_label: String,
    pub session_ttl: Duration,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("provider", &self.provider)
            .field("api_key", &"[REDACTED]")
            .field("api_hostname", &self.api_hostname)
            .field("model", &self.model)
            .field("system_message", &self.system_message)
            .field("page_title", &self.page_title)
            .field("assistant_label", &self.assistant_label)
            .field("session_ttl", &self.session_ttl)
            .finish()
    }
}

impl AppConfig {
    /// Load the configuration from environment variables, falling
    /// back to the TOML secrets file for the credential.
    pub fn from_env() -> Result<Self, ConfigError> {
        let secrets_path =
            env::var("CHATBOT_SECRETS_PATH").unwrap_or_else(|_| DEFAULT_SECRETS_PATH.to_string());
        let secrets = load_secrets(Path::new(&secrets_path))?;
        Self::from_lookup(|key| env::var(key).ok(), &secrets)
    }

    /// Resolve every setting through `lookup`, consulting `secrets`
    /// only for the credential.
    pub fn from_lookup<F>(lookup: F, secrets: &toml::Table) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Empty values are treated the same as unset ones
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let provider = match get("CHATBOT_PROVIDER") {
            Some(p) => p.parse::<Provider>()?,
            None => Provider::Gemini,
        };

        let credential_var = provider.credential_var();
        let api_key = get(credential_var)
            .or_else(|| {
                secrets
                    .get(credential_var)
                    .and_then(|v| v.as_str())
                    .filter(|v| !v.trim().is_empty())
                    .map(String::from)
            })
            .ok_or(ConfigError::MissingCredential(credential_var))?;

        let api_hostname = get("CHATBOT_API_HOST")
            .unwrap_or_else(|| provider.default_api_hostname().to_string());
        let model = get("CHATBOT_MODEL").unwrap_or_else(|| provider.default_model().to_string());
        let system_message = get("CHATBOT_SYSTEM_MESSAGE");
        let page_title =
            get("CHATBOT_PAGE_TITLE").unwrap_or_else(|| String::from("Gemini Chatbot"));
        let assistant_label =
            get("CHATBOT_ASSISTANT_LABEL").unwrap_or_else(|| String::from("Gemini"));
        let session_ttl = match get("CHATBOT_SESSION_TTL_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::InvalidSetting {
                    key: "CHATBOT_SESSION_TTL_SECS",
                    value: v,
                })?,
            None => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        Ok(Self {
            provider,
            api_key,
            api_hostname,
            model,
            system_message,
            page_title,
            assistant_label,
            session_ttl,
        })
    }
}

/// Read the secrets file. A file that doesn't exist is the same as an
/// empty one; anything else that goes wrong is fatal.
pub fn load_secrets(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(toml::Table::new()),
        Err(source) => {
            return Err(ConfigError::SecretsRead {
                path: path.display().to_string(),
                source,
            });
        }
    };

    contents
        .parse::<toml::Table>()
        .map_err(|source| ConfigError::SecretsParse {
            path: path.display().to_string(),
            source,
        })
}
