//! Configuration layering, environment overrides and command-line overrides
//!
//! Layers apply in increasing priority: built-in defaults, the global
//! `~/.cairn/config.toml`, the nearest project `cairn.toml`, `CAIRN_*`
//! environment variables and finally command-line flags.

use std::collections::HashMap;
use std::str::FromStr;

use cairn_core::error::CairnError;
use cairn_core::HashAlgorithm;
use camino::{Utf8Path, Utf8PathBuf};

use crate::settings::{self, CairnToml};
use crate::ConfigResult;

/// Name of the project configuration file
pub const PROJECT_FILE: &str = "cairn.toml";

/// Main configuration loading interface
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Current working directory
    cwd: Utf8PathBuf,
    /// Home directory holding `.cairn/config.toml`
    home: Option<Utf8PathBuf>,
}

/// Configuration layering and merging
pub struct ConfigLayering;

/// Where a configuration value came from
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigSource {
    /// Built-in defaults
    Defaults,
    /// Global config file
    Global(Utf8PathBuf),
    /// Project cairn.toml file
    Project(Utf8PathBuf),
    /// Environment variable
    Environment(String),
    /// CLI flag
    CommandLine,
}

/// A fully merged configuration and the layers that contributed to it
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: CairnToml,
    pub sources: Vec<ConfigSource>,
}

impl ConfigLoader {
    /// Create a new configuration loader rooted at `cwd`
    pub fn new(cwd: Utf8PathBuf) -> Self {
        let home = dirs::home_dir().and_then(|home| Utf8PathBuf::try_from(home).ok());
        Self { cwd, home }
    }

    /// Override the home directory used to find the global config
    pub fn with_home(mut self, home: Option<Utf8PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Find a configuration file by walking up from the working directory
    pub fn resolve_config_path(&self, filename: &str) -> Option<Utf8PathBuf> {
        let mut current = Some(self.cwd.as_path());
        while let Some(dir) = current {
            let candidate = dir.join(filename);
            if candidate.is_file() {
                return Some(candidate);
            }
            current = dir.parent();
        }
        None
    }

    /// Path of the global configuration file, whether or not it exists
    pub fn global_config_path(&self) -> Option<Utf8PathBuf> {
        self.home
            .as_ref()
            .map(|home| home.join(".cairn").join("config.toml"))
    }

    /// Load every layer and merge them into one validated configuration
    pub async fn load(&self, cli_overrides: HashMap<String, String>) -> ConfigResult<LoadedConfig> {
        let mut sources = vec![ConfigSource::Defaults];

        let global = match self.global_config_path() {
            Some(path) if path.is_file() => {
                let table = load_table(&path).await?;
                sources.push(ConfigSource::Global(path));
                Some(table)
            }
            _ => None,
        };

        let project = match self.resolve_config_path(PROJECT_FILE) {
            Some(path) => {
                let table = load_table(&path).await?;
                sources.push(ConfigSource::Project(path));
                Some(table)
            }
            None => None,
        };

        let env_overrides = ConfigLayering::collect_env_overrides();
        sources.extend(
            env_overrides
                .keys()
                .map(|key| ConfigSource::Environment(key.clone())),
        );
        if !cli_overrides.is_empty() {
            sources.push(ConfigSource::CommandLine);
        }

        let config = ConfigLayering::merge_configs(global, project, env_overrides, cli_overrides)?;
        tracing::debug!("Loaded configuration from {} layers", sources.len());
        Ok(LoadedConfig { config, sources })
    }
}

async fn load_table(path: &Utf8Path) -> ConfigResult<toml::Table> {
    let content = settings::read_file(path).await?;
    settings::parse_table(&content).map_err(|e| settings::in_file(path, e))
}

impl ConfigLayering {
    /// Merge configuration layers, later layers winning key by key
    pub fn merge_configs(
        global: Option<toml::Table>,
        project: Option<toml::Table>,
        env_overrides: HashMap<String, String>,
        cli_overrides: HashMap<String, String>,
    ) -> ConfigResult<CairnToml> {
        let mut merged = global.unwrap_or_default();
        if let Some(project) = project {
            deep_merge(&mut merged, project);
        }

        let mut config = settings::from_table(merged, None)?;

        Self::apply_env_overrides(&mut config, &env_overrides)?;
        Self::apply_cli_overrides(&mut config, &cli_overrides)?;

        settings::validate_config(&config)?;
        Ok(config)
    }

    /// Apply `CAIRN_*` environment variable overrides
    fn apply_env_overrides(
        config: &mut CairnToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            let field = match key.as_str() {
                "CAIRN_HASH_WORKERS" => "archiver.max-concurrent-hash",
                "CAIRN_LOOKUP_WORKERS" => "archiver.max-concurrent-contains",
                "CAIRN_UPLOAD_WORKERS" => "archiver.max-concurrent-upload",
                "CAIRN_BATCH_SIZE" => "archiver.contains-batch-size",
                "CAIRN_BATCH_DELAY_MS" => "archiver.contains-batching-delay-ms",
                "CAIRN_HASH_ALGORITHM" => "archiver.hash-algorithm",
                "CAIRN_STORE_PATH" => "store.path",
                // Unknown environment variable, ignore
                _ => continue,
            };
            set_field(config, field, value, key)?;
        }
        Ok(())
    }

    /// Apply dotted-key overrides from command-line flags
    fn apply_cli_overrides(
        config: &mut CairnToml,
        overrides: &HashMap<String, String>,
    ) -> ConfigResult<()> {
        for (key, value) in overrides {
            set_field(config, key, value, key)?;
        }
        Ok(())
    }

    /// Collect `CAIRN_*` environment variables
    pub fn collect_env_overrides() -> HashMap<String, String> {
        std::env::vars()
            .filter(|(key, _)| key.starts_with("CAIRN_"))
            .collect()
    }
}

/// Recursively merge `overlay` into `base`; tables merge, everything else replaces
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn set_field(config: &mut CairnToml, field: &str, value: &str, origin: &str) -> ConfigResult<()> {
    let archiver = &mut config.archiver;
    match field {
        "archiver.max-concurrent-hash" => archiver.max_concurrent_hash = parse(value, origin)?,
        "archiver.max-concurrent-contains" => {
            archiver.max_concurrent_contains = parse(value, origin)?
        }
        "archiver.max-concurrent-upload" => archiver.max_concurrent_upload = parse(value, origin)?,
        "archiver.contains-batch-size" => archiver.contains_batch_size = parse(value, origin)?,
        "archiver.contains-batching-delay-ms" => {
            archiver.contains_batching_delay_ms = parse(value, origin)?
        }
        "archiver.hash-algorithm" => archiver.hash_algorithm = HashAlgorithm::from_str(value)?,
        "archiver.dedupe-queue" => archiver.dedupe_queue = parse(value, origin)?,
        "archiver.hash-queue" => archiver.hash_queue = parse(value, origin)?,
        "archiver.lookup-queue" => archiver.lookup_queue = parse(value, origin)?,
        "archiver.upload-queue" => archiver.upload_queue = parse(value, origin)?,
        "store.path" => config.store.path = Some(Utf8PathBuf::from(value)),
        _ => {
            return Err(CairnError::ConfigValidation {
                field: origin.to_string(),
                reason: format!("unknown configuration key '{}'", field),
            })
        }
    }
    Ok(())
}

fn parse<T>(value: &str, origin: &str) -> ConfigResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e: T::Err| CairnError::ConfigValidation {
            field: origin.to_string(),
            reason: format!("invalid value '{}': {}", value, e),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn utf8_dir(temp_dir: &TempDir) -> Utf8PathBuf {
        Utf8PathBuf::try_from(temp_dir.path().to_path_buf()).unwrap()
    }

    fn table(content: &str) -> toml::Table {
        settings::parse_table(content).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_config_path_walks_up() {
        let temp_dir = TempDir::new().unwrap();
        let root = utf8_dir(&temp_dir);
        let nested = root.join("a").join("b");
        tokio::fs::create_dir_all(&nested).await.unwrap();
        tokio::fs::write(root.join(PROJECT_FILE), "").await.unwrap();

        let loader = ConfigLoader::new(nested).with_home(None);
        assert_eq!(
            loader.resolve_config_path(PROJECT_FILE),
            Some(root.join(PROJECT_FILE))
        );
        assert_eq!(loader.resolve_config_path("missing.toml"), None);
    }

    #[tokio::test]
    async fn test_load_without_files_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let loader = ConfigLoader::new(utf8_dir(&temp_dir)).with_home(None);

        let loaded = loader.load(HashMap::new()).await.unwrap();
        assert_eq!(loaded.config.archiver, CairnToml::default().archiver);
        assert_eq!(loaded.sources[0], ConfigSource::Defaults);
    }

    #[tokio::test]
    async fn test_project_overrides_global() {
        let home_dir = TempDir::new().unwrap();
        let project_dir = TempDir::new().unwrap();
        let home = utf8_dir(&home_dir);
        let project = utf8_dir(&project_dir);

        tokio::fs::create_dir_all(home.join(".cairn")).await.unwrap();
        tokio::fs::write(
            home.join(".cairn").join("config.toml"),
            "[archiver]\nmax-concurrent-upload = 3\ncontains-batch-size = 20\n",
        )
        .await
        .unwrap();
        tokio::fs::write(
            project.join(PROJECT_FILE),
            "[archiver]\ncontains-batch-size = 10\n",
        )
        .await
        .unwrap();

        let loader = ConfigLoader::new(project.clone()).with_home(Some(home.clone()));
        let loaded = loader.load(HashMap::new()).await.unwrap();

        assert_eq!(loaded.config.archiver.max_concurrent_upload, 3);
        assert_eq!(loaded.config.archiver.contains_batch_size, 10);
        assert!(loaded
            .sources
            .contains(&ConfigSource::Global(home.join(".cairn").join("config.toml"))));
        assert!(loaded
            .sources
            .contains(&ConfigSource::Project(project.join(PROJECT_FILE))));
    }

    #[test]
    fn test_merge_configs_priority() {
        let global = table("[archiver]\nmax-concurrent-hash = 2\nhash-queue = 100\n");
        let project = table("[archiver]\nmax-concurrent-hash = 3\n");
        let env = HashMap::from([("CAIRN_BATCH_SIZE".to_string(), "25".to_string())]);
        let cli = HashMap::from([
            ("archiver.contains-batch-size".to_string(), "5".to_string()),
            ("store.path".to_string(), "/tmp/store".to_string()),
        ]);

        let merged = ConfigLayering::merge_configs(Some(global), Some(project), env, cli).unwrap();

        assert_eq!(merged.archiver.max_concurrent_hash, 3);
        assert_eq!(merged.archiver.hash_queue, 100);
        assert_eq!(merged.archiver.contains_batch_size, 5);
        assert_eq!(merged.store.path, Some(Utf8PathBuf::from("/tmp/store")));
    }

    #[test]
    fn test_env_override_typed() {
        let env = HashMap::from([
            ("CAIRN_HASH_ALGORITHM".to_string(), "sha1".to_string()),
            ("CAIRN_BATCH_DELAY_MS".to_string(), "5".to_string()),
            ("CAIRN_UNRELATED".to_string(), "ignored".to_string()),
        ]);
        let merged = ConfigLayering::merge_configs(None, None, env, HashMap::new()).unwrap();
        assert_eq!(merged.archiver.hash_algorithm, HashAlgorithm::Sha1);
        assert_eq!(merged.archiver.contains_batching_delay_ms, 5);
    }

    #[test]
    fn test_invalid_env_value_names_variable() {
        let env = HashMap::from([("CAIRN_UPLOAD_WORKERS".to_string(), "many".to_string())]);
        match ConfigLayering::merge_configs(None, None, env, HashMap::new()) {
            Err(CairnError::ConfigValidation { field, .. }) => {
                assert_eq!(field, "CAIRN_UPLOAD_WORKERS");
            }
            other => panic!("Expected ConfigValidation error, got {:?}", other),
        }
    }

    #[test]
    fn test_override_to_zero_rejected() {
        let cli = HashMap::from([("archiver.max-concurrent-hash".to_string(), "0".to_string())]);
        assert!(ConfigLayering::merge_configs(None, None, HashMap::new(), cli).is_err());
    }

    #[test]
    fn test_unknown_cli_key_rejected() {
        let cli = HashMap::from([("archiver.speed".to_string(), "fast".to_string())]);
        assert!(ConfigLayering::merge_configs(None, None, HashMap::new(), cli).is_err());
    }

    #[test]
    fn test_deep_merge_keeps_sibling_keys() {
        let mut base = table("[archiver]\nhash-queue = 1\n[store]\npath = \"a\"\n");
        deep_merge(&mut base, table("[archiver]\nupload-queue = 2\n"));
        let config = settings::from_table(base, None).unwrap();
        assert_eq!(config.archiver.hash_queue, 1);
        assert_eq!(config.archiver.upload_queue, 2);
        assert_eq!(config.store.path, Some(Utf8PathBuf::from("a")));
    }
}
