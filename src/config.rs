use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub corpus: CorpusConfig,
    #[serde(default)]
    pub geocoding: GeocodingConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
    #[serde(default)]
    pub related: RelatedConfig,
    #[serde(default)]
    pub server: ServerConfig,
    /// Extra curated place → [latitude, longitude] entries merged into the
    /// built-in override table.
    #[serde(default)]
    pub overrides: HashMap<String, [f64; 2]>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CorpusConfig {
    pub dir: PathBuf,
    #[serde(default = "default_include_globs")]
    pub include_globs: Vec<String>,
}

fn default_include_globs() -> Vec<String> {
    vec!["**/*.pdf".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct GeocodingConfig {
    #[serde(default = "default_geocoding_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Minimum spacing between calls to the geocoding service, enforced
    /// globally. The service forbids concurrent bursts; this is the
    /// correctness mechanism, not a tuning knob.
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeocodingConfig {
    fn default() -> Self {
        Self {
            endpoint: default_geocoding_endpoint(),
            user_agent: default_user_agent(),
            min_delay_ms: default_min_delay_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_geocoding_endpoint() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}
fn default_user_agent() -> String {
    "news-atlas/0.1".to_string()
}
fn default_min_delay_ms() -> u64 {
    1100
}
fn default_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct InferenceConfig {
    /// `"openai"` or `"disabled"`.
    #[serde(default = "default_inference_provider")]
    pub provider: String,
    #[serde(default = "default_inference_model")]
    pub model: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            provider: default_inference_provider(),
            model: default_inference_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_inference_provider() -> String {
    "openai".to_string()
}
fn default_inference_model() -> String {
    "gpt-4o".to_string()
}

impl InferenceConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelatedConfig {
    #[serde(default = "default_related_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            endpoint: default_related_endpoint(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_related_endpoint() -> String {
    "https://google.serper.dev/search".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1:7331".to_string()
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.corpus.include_globs.is_empty() {
        anyhow::bail!("corpus.include_globs must not be empty");
    }

    // The geocoding service's usage policy requires at least 1.1s between calls.
    if config.geocoding.min_delay_ms < 1100 {
        anyhow::bail!("geocoding.min_delay_ms must be >= 1100");
    }

    if config.geocoding.timeout_secs == 0 {
        anyhow::bail!("geocoding.timeout_secs must be > 0");
    }

    match config.inference.provider.as_str() {
        "disabled" | "openai" => {}
        other => anyhow::bail!(
            "Unknown inference provider: '{}'. Must be disabled or openai.",
            other
        ),
    }

    for (place, coords) in &config.overrides {
        if !(-90.0..=90.0).contains(&coords[0]) || !(-180.0..=180.0).contains(&coords[1]) {
            anyhow::bail!("overrides entry '{}' has out-of-range coordinates", place);
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> (tempfile::TempDir, PathBuf) {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("atlas.toml");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(content.as_bytes()).unwrap();
        (tmp, path)
    }

    #[test]
    fn minimal_config_fills_defaults() {
        let (_tmp, path) = write_config("[corpus]\ndir = \"sampledata\"\n");
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.corpus.include_globs, vec!["**/*.pdf"]);
        assert_eq!(cfg.geocoding.min_delay_ms, 1100);
        assert_eq!(cfg.geocoding.timeout_secs, 10);
        assert_eq!(cfg.inference.model, "gpt-4o");
        assert_eq!(cfg.server.bind, "127.0.0.1:7331");
        assert!(cfg.overrides.is_empty());
    }

    #[test]
    fn rejects_sub_policy_delay() {
        let (_tmp, path) = write_config(
            "[corpus]\ndir = \"sampledata\"\n[geocoding]\nmin_delay_ms = 500\n",
        );
        let err = load_config(&path).unwrap_err();
        assert!(err.to_string().contains("min_delay_ms"));
    }

    #[test]
    fn rejects_unknown_inference_provider() {
        let (_tmp, path) = write_config(
            "[corpus]\ndir = \"sampledata\"\n[inference]\nprovider = \"oracle\"\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn rejects_out_of_range_override() {
        let (_tmp, path) = write_config(
            "[corpus]\ndir = \"sampledata\"\n[overrides]\n\"어딘가\" = [120.0, 0.0]\n",
        );
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn parses_override_entries() {
        let (_tmp, path) = write_config(
            "[corpus]\ndir = \"sampledata\"\n[overrides]\n\"페루, 쿠스코\" = [-13.5319, -71.9675]\n",
        );
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.overrides["페루, 쿠스코"], [-13.5319, -71.9675]);
    }
}
