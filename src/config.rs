//! Optional config file loading. Search order: ./ficpreview.toml, then
//! $XDG_CONFIG_HOME/ficpreview/config.toml (or ~/.config/ficpreview/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override
/// defaults. CLI flags override config.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Charset used when a page declares none (e.g. "windows-1252").
    pub fallback_charset: Option<String>,
    /// Path of the JSON collection file used by the collection subcommands.
    pub collection_path: Option<PathBuf>,
}

/// Search order: (1) ./ficpreview.toml, (2) $XDG_CONFIG_HOME/ficpreview/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present
/// file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("ficpreview.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("ficpreview").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            return Ok(Some(config));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_empty_config() {
        let c: Config = toml::from_str("").unwrap();
        assert!(c.user_agent.is_none());
        assert!(c.timeout_secs.is_none());
        assert!(c.fallback_charset.is_none());
        assert!(c.collection_path.is_none());
    }

    #[test]
    fn parse_full_config() {
        let s = r#"
            user_agent = "Custom/1.0"
            timeout_secs = 12
            fallback_charset = "iso-8859-1"
            collection_path = "stories.json"
        "#;
        let c: Config = toml::from_str(s).unwrap();
        assert_eq!(c.user_agent.as_deref(), Some("Custom/1.0"));
        assert_eq!(c.timeout_secs, Some(12));
        assert_eq!(c.fallback_charset.as_deref(), Some("iso-8859-1"));
        assert_eq!(
            c.collection_path.as_deref(),
            Some(std::path::Path::new("stories.json"))
        );
    }

    #[test]
    fn parse_partial_config() {
        let c: Config = toml::from_str("timeout_secs = 4").unwrap();
        assert_eq!(c.timeout_secs, Some(4));
        assert!(c.user_agent.is_none());
    }

    #[test]
    fn invalid_toml_errors() {
        assert!(toml::from_str::<Config>("user_agent = [").is_err());
    }
}
