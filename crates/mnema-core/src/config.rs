//! Environment-driven configuration.
//!
//! [`Config::from_env`] is pure: it reads the `MNEMA_*` variables once,
//! applies defaults, and reports every missing required key in a single
//! error instead of failing on the first one.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variables: {}", .0.join(", "))]
    Missing(Vec<String>),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,

    pub repo_url: String,
    pub repo_dir: PathBuf,
    pub repo_username: Option<String>,
    pub repo_token: Option<String>,

    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,

    pub voyage_api_key: String,
    pub voyage_base_url: String,
    pub voyage_model: String,
    pub voyage_max_input_chars: usize,

    pub qdrant_url: String,
    pub collection: String,

    pub chunk_max_chars: usize,
    pub chunk_overlap: f32,
    pub top_k: u64,

    pub rate_limit_per_minute: u32,
    pub max_body_bytes: usize,
    pub auth_token: Option<String>,
    pub source_tag: Option<String>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("port", &self.port)
            .field("repo_url", &self.repo_url)
            .field("repo_dir", &self.repo_dir)
            .field("repo_username", &self.repo_username)
            .field("repo_token", &self.repo_token.as_ref().map(|_| "<redacted>"))
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("openai_model", &self.openai_model)
            .field("voyage_api_key", &"<redacted>")
            .field("voyage_base_url", &self.voyage_base_url)
            .field("voyage_model", &self.voyage_model)
            .field("voyage_max_input_chars", &self.voyage_max_input_chars)
            .field("qdrant_url", &self.qdrant_url)
            .field("collection", &self.collection)
            .field("chunk_max_chars", &self.chunk_max_chars)
            .field("chunk_overlap", &self.chunk_overlap)
            .field("top_k", &self.top_k)
            .field("rate_limit_per_minute", &self.rate_limit_per_minute)
            .field("max_body_bytes", &self.max_body_bytes)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "<redacted>"))
            .field("source_tag", &self.source_tag)
            .finish()
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(v) => v.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key: key.to_owned(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

impl Config {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] listing every required variable that
    /// is absent, or [`ConfigError::Invalid`] for the first value that fails
    /// to parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut missing = Vec::new();
        let mut required = |key: &str| {
            let v = optional(key);
            if v.is_none() {
                missing.push(key.to_owned());
            }
            v
        };

        let repo_url = required("MNEMA_REPO_URL");
        let openai_api_key = required("MNEMA_OPENAI_API_KEY");
        let voyage_api_key = required("MNEMA_VOYAGE_API_KEY");
        let qdrant_url = required("MNEMA_QDRANT_URL");

        let (Some(repo_url), Some(openai_api_key), Some(voyage_api_key), Some(qdrant_url)) =
            (repo_url, openai_api_key, voyage_api_key, qdrant_url)
        else {
            return Err(ConfigError::Missing(missing));
        };

        let chunk_overlap: f32 = parse("MNEMA_CHUNK_OVERLAP", 0.2)?;
        if !(0.0..=1.0).contains(&chunk_overlap) {
            return Err(ConfigError::Invalid {
                key: "MNEMA_CHUNK_OVERLAP".to_owned(),
                reason: format!("{chunk_overlap} is outside 0.0..=1.0"),
            });
        }

        Ok(Self {
            bind_addr: optional("MNEMA_BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_owned()),
            port: parse("MNEMA_PORT", 8080)?,
            repo_url,
            repo_dir: optional("MNEMA_REPO_DIR")
                .map_or_else(|| PathBuf::from("./data/notes"), PathBuf::from),
            repo_username: optional("MNEMA_REPO_USERNAME"),
            repo_token: optional("MNEMA_REPO_TOKEN"),
            openai_api_key,
            openai_base_url: optional("MNEMA_OPENAI_BASE_URL")
                .unwrap_or_else(|| "https://api.openai.com/v1".to_owned()),
            openai_model: optional("MNEMA_OPENAI_MODEL").unwrap_or_else(|| "gpt-4o".to_owned()),
            voyage_api_key,
            voyage_base_url: optional("MNEMA_VOYAGE_BASE_URL")
                .unwrap_or_else(|| "https://api.voyageai.com/v1".to_owned()),
            voyage_model: optional("MNEMA_VOYAGE_MODEL").unwrap_or_else(|| "voyage-3".to_owned()),
            voyage_max_input_chars: parse("MNEMA_VOYAGE_MAX_INPUT_CHARS", 40_000)?,
            qdrant_url,
            collection: optional("MNEMA_COLLECTION").unwrap_or_else(|| "notes".to_owned()),
            chunk_max_chars: parse("MNEMA_CHUNK_MAX_CHARS", 10_000)?,
            chunk_overlap,
            top_k: parse("MNEMA_TOP_K", 4)?,
            rate_limit_per_minute: parse("MNEMA_RATE_LIMIT_PER_MINUTE", 120)?,
            max_body_bytes: parse("MNEMA_MAX_BODY_BYTES", 1_048_576)?,
            auth_token: optional("MNEMA_AUTH_TOKEN"),
            source_tag: optional("MNEMA_SOURCE_TAG"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const REQUIRED: &[&str] = &[
        "MNEMA_REPO_URL",
        "MNEMA_OPENAI_API_KEY",
        "MNEMA_VOYAGE_API_KEY",
        "MNEMA_QDRANT_URL",
    ];

    fn clear_env() {
        for (key, _) in std::env::vars() {
            if key.starts_with("MNEMA_") {
                unsafe { std::env::remove_var(&key) };
            }
        }
    }

    fn set_required() {
        unsafe {
            std::env::set_var("MNEMA_REPO_URL", "https://example.com/notes.git");
            std::env::set_var("MNEMA_OPENAI_API_KEY", "sk-test");
            std::env::set_var("MNEMA_VOYAGE_API_KEY", "pa-test");
            std::env::set_var("MNEMA_QDRANT_URL", "http://localhost:6334");
        }
    }

    #[test]
    #[serial]
    fn missing_required_lists_all_keys() {
        clear_env();
        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::Missing(keys) => {
                for key in REQUIRED {
                    assert!(keys.contains(&(*key).to_owned()), "missing {key}");
                }
            }
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn defaults_applied() {
        clear_env();
        set_required();
        let config = Config::from_env().unwrap();
        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.port, 8080);
        assert_eq!(config.repo_dir, PathBuf::from("./data/notes"));
        assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
        assert_eq!(config.openai_model, "gpt-4o");
        assert_eq!(config.voyage_base_url, "https://api.voyageai.com/v1");
        assert_eq!(config.voyage_model, "voyage-3");
        assert_eq!(config.voyage_max_input_chars, 40_000);
        assert_eq!(config.collection, "notes");
        assert_eq!(config.chunk_max_chars, 10_000);
        assert!((config.chunk_overlap - 0.2).abs() < f32::EPSILON);
        assert_eq!(config.top_k, 4);
        assert_eq!(config.rate_limit_per_minute, 120);
        assert_eq!(config.max_body_bytes, 1_048_576);
        assert!(config.auth_token.is_none());
        assert!(config.source_tag.is_none());
    }

    #[test]
    #[serial]
    fn overrides_take_effect() {
        clear_env();
        set_required();
        unsafe {
            std::env::set_var("MNEMA_PORT", "9999");
            std::env::set_var("MNEMA_COLLECTION", "journal");
            std::env::set_var("MNEMA_TOP_K", "8");
            std::env::set_var("MNEMA_AUTH_TOKEN", "secret");
        }
        let config = Config::from_env().unwrap();
        assert_eq!(config.port, 9999);
        assert_eq!(config.collection, "journal");
        assert_eq!(config.top_k, 8);
        assert_eq!(config.auth_token.as_deref(), Some("secret"));
    }

    #[test]
    #[serial]
    fn invalid_port_reports_key() {
        clear_env();
        set_required();
        unsafe { std::env::set_var("MNEMA_PORT", "not-a-port") };
        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::Invalid { key, .. } => assert_eq!(key, "MNEMA_PORT"),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn overlap_out_of_range_rejected() {
        clear_env();
        set_required();
        unsafe { std::env::set_var("MNEMA_CHUNK_OVERLAP", "1.5") };
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
    }

    #[test]
    #[serial]
    fn blank_value_treated_as_missing() {
        clear_env();
        set_required();
        unsafe { std::env::set_var("MNEMA_REPO_URL", "  ") };
        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::Missing(keys) => assert_eq!(keys, vec!["MNEMA_REPO_URL".to_owned()]),
            other => panic!("expected Missing, got {other:?}"),
        }
    }

    #[test]
    #[serial]
    fn debug_redacts_secrets() {
        clear_env();
        set_required();
        unsafe { std::env::set_var("MNEMA_AUTH_TOKEN", "topsecret") };
        let config = Config::from_env().unwrap();
        let dbg = format!("{config:?}");
        assert!(!dbg.contains("sk-test"));
        assert!(!dbg.contains("pa-test"));
        assert!(!dbg.contains("topsecret"));
        assert!(dbg.contains("<redacted>"));
    }
}
