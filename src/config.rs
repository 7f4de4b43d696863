use std::path::PathBuf;
use std::str::FromStr;

pub const GEMINI_KEY_PLACEHOLDERS: &[&str] = &["your_gemini_key_here"];
pub const OPENAI_KEY_PLACEHOLDERS: &[&str] = &["your_openai_api_key_here", "dummy_key_for_testing"];

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub openai_api_key: Option<String>,
    pub gemini_model: String,
    pub openai_model: String,
    pub gemini_base_url: String,
    pub openai_base_url: String,
    pub llm_timeout_secs: u64,
    pub llm_connect_timeout_secs: u64,
    pub allowed_origins: Vec<String>,
    pub host: String,
    pub port: u16,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            openai_api_key: None,
            gemini_model: "gemini-flash-latest".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            llm_timeout_secs: 120,
            llm_connect_timeout_secs: 10,
            allowed_origins: vec!["*".to_string()],
            host: "0.0.0.0".to_string(),
            port: 8000,
            upload_dir: PathBuf::from("uploads"),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Reads the process environment. Call `dotenvy::dotenv()` first to pick up `.env`.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let non_blank = |key: &str| non_blank_var(&lookup, key);

        Self {
            gemini_api_key: non_blank("GEMINI_API_KEY").map(|v| v.trim().to_string()),
            openai_api_key: non_blank("OPENAI_API_KEY").map(|v| v.trim().to_string()),
            gemini_model: non_blank("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            openai_model: non_blank("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            gemini_base_url: non_blank("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            openai_base_url: non_blank("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            llm_timeout_secs: parsed_var(&lookup, "LLM_TIMEOUT_SECS").unwrap_or(defaults.llm_timeout_secs),
            llm_connect_timeout_secs: parsed_var(&lookup, "LLM_CONNECT_TIMEOUT_SECS")
                .unwrap_or(defaults.llm_connect_timeout_secs),
            allowed_origins: non_blank("ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
            host: non_blank("HOST").unwrap_or(defaults.host),
            port: parsed_var(&lookup, "PORT").unwrap_or(defaults.port),
            upload_dir: non_blank("UPLOAD_DIR").map(PathBuf::from).unwrap_or(defaults.upload_dir),
            max_upload_bytes: parsed_var(&lookup, "MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
        }
    }

    /// Gemini key, unless it is missing or still a template placeholder.
    pub fn usable_gemini_key(&self) -> Option<&str> {
        usable_key(self.gemini_api_key.as_deref(), GEMINI_KEY_PLACEHOLDERS)
    }

    pub fn usable_openai_key(&self) -> Option<&str> {
        usable_key(self.openai_api_key.as_deref(), OPENAI_KEY_PLACEHOLDERS)
    }

    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}

fn non_blank_var(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parsed_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    non_blank_var(lookup, key).and_then(|v| v.trim().parse().ok())
}

fn usable_key<'a>(key: Option<&'a str>, placeholders: &[&str]) -> Option<&'a str> {
    key.filter(|k| !placeholders.contains(k))
}

/// Masks a secret for logs: first and last four characters only.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn defaults_when_environment_is_empty() {
        let cfg = config_from(&[]);
        assert_eq!(cfg.port, 8000);
        assert_eq!(cfg.openai_model, "gpt-4o-mini");
        assert!(cfg.allows_any_origin());
        assert!(cfg.usable_gemini_key().is_none());
        assert!(cfg.usable_openai_key().is_none());
    }

    #[test]
    fn placeholders_count_as_unset() {
        let cfg = config_from(&[
            ("GEMINI_API_KEY", "your_gemini_key_here"),
            ("OPENAI_API_KEY", "dummy_key_for_testing"),
        ]);
        assert!(cfg.usable_gemini_key().is_none());
        assert!(cfg.usable_openai_key().is_none());

        let cfg = config_from(&[("OPENAI_API_KEY", "your_openai_api_key_here")]);
        assert!(cfg.usable_openai_key().is_none());

        let cfg = config_from(&[("GEMINI_API_KEY", "  "), ("OPENAI_API_KEY", "sk-live")]);
        assert!(cfg.gemini_api_key.is_none());
        assert_eq!(cfg.usable_openai_key(), Some("sk-live"));
    }

    #[test]
    fn origins_port_and_invalid_numbers() {
        let cfg = config_from(&[
            ("ALLOWED_ORIGINS", "http://localhost:3000, https://quiz.example.com,"),
            ("PORT", "9001"),
            ("LLM_TIMEOUT_SECS", "soon"),
        ]);
        assert_eq!(
            cfg.allowed_origins,
            vec!["http://localhost:3000".to_string(), "https://quiz.example.com".to_string()]
        );
        assert!(!cfg.allows_any_origin());
        assert_eq!(cfg.port, 9001);
        assert_eq!(cfg.llm_timeout_secs, 120);
    }

    #[test]
    fn secrets_are_masked() {
        assert_eq!(mask_secret("AIzaSyExample1234"), "AIza...1234");
        assert_eq!(mask_secret("short"), "****");
    }
}
