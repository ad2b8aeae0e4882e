//! Configuration file support for manifestctl
//!
//! Supports `.manifestctl.yaml` files that can be placed anywhere in the directory
//! hierarchy. manifestctl searches from the working directory upward to the filesystem root.
//! Command-line flags override values from the file.

use std::{
	fs,
	path::{Path, PathBuf},
	time::Duration,
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::client::{ClientOptions, ConnectionProfile, NamespaceSource};

/// The name of the config file manifestctl looks for
pub const CONFIG_FILE_NAME: &str = ".manifestctl.yaml";

/// Root configuration structure for .manifestctl.yaml
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolConfig {
	/// Kubeconfig path. Relative paths are resolved against the config file's directory.
	#[serde(default)]
	pub kubeconfig: Option<PathBuf>,

	/// Kubeconfig context to use instead of `current-context`.
	#[serde(default)]
	pub context: Option<String>,

	/// Default namespace for namespaced kinds.
	#[serde(default)]
	pub namespace: Option<String>,

	/// Whether create honours `metadata.namespace` from manifests.
	#[serde(default)]
	pub namespace_source: Option<NamespaceSource>,

	/// Objects requested per list page.
	#[serde(default)]
	pub page_size: Option<u32>,

	/// Per-request timeout.
	#[serde(default)]
	pub timeout_seconds: Option<u64>,
}

impl ToolConfig {
	/// Load config by searching from the given directory upward
	pub fn load_from_directory(start_dir: &Path) -> Result<Option<Self>> {
		if let Some(config_path) = find_config_file(start_dir) {
			let config = Self::load_from_file(&config_path)?;
			Ok(Some(config))
		} else {
			Ok(None)
		}
	}

	/// Load config from a specific file path
	pub fn load_from_file(path: &Path) -> Result<Self> {
		let content = fs::read_to_string(path)
			.with_context(|| format!("failed to read config file: {}", path.display()))?;
		let mut config: ToolConfig = serde_yaml_with_quirks::from_str(&content)
			.with_context(|| format!("failed to parse config file: {}", path.display()))?;

		if let (Some(kubeconfig), Some(dir)) = (&config.kubeconfig, path.parent()) {
			if kubeconfig.is_relative() {
				config.kubeconfig = Some(dir.join(kubeconfig));
			}
		}
		Ok(config)
	}

	/// Merge overrides over this config (override values win where set)
	pub fn merge_from(&mut self, overrides: &ToolConfig) {
		if overrides.kubeconfig.is_some() {
			self.kubeconfig.clone_from(&overrides.kubeconfig);
		}
		if overrides.context.is_some() {
			self.context.clone_from(&overrides.context);
		}
		if overrides.namespace.is_some() {
			self.namespace.clone_from(&overrides.namespace);
		}
		if overrides.namespace_source.is_some() {
			self.namespace_source = overrides.namespace_source;
		}
		if overrides.page_size.is_some() {
			self.page_size = overrides.page_size;
		}
		if overrides.timeout_seconds.is_some() {
			self.timeout_seconds = overrides.timeout_seconds;
		}
	}

	pub fn connection_profile(&self) -> ConnectionProfile {
		ConnectionProfile {
			kubeconfig: self.kubeconfig.clone(),
			context: self.context.clone(),
		}
	}

	pub fn client_options(&self, dry_run: bool) -> ClientOptions {
		ClientOptions::builder()
			.maybe_namespace(self.namespace.clone())
			.maybe_namespace_source(self.namespace_source)
			.maybe_page_size(self.page_size)
			.maybe_timeout(self.timeout_seconds.map(Duration::from_secs))
			.dry_run(dry_run)
			.build()
	}
}

/// Search for a config file starting from `start_dir` and walking up to the filesystem root
pub fn find_config_file(start_dir: &Path) -> Option<PathBuf> {
	let mut current = start_dir.to_path_buf();

	// Canonicalize if possible to handle relative paths
	if let Ok(canonical) = current.canonicalize() {
		current = canonical;
	}

	loop {
		let config_path = current.join(CONFIG_FILE_NAME);
		if config_path.exists() {
			return Some(config_path);
		}

		match current.parent() {
			Some(parent) if parent != current => current = parent.to_path_buf(),
			_ => break,
		}
	}

	None
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use tempfile::TempDir;

	use super::*;

	#[test]
	fn test_find_config_in_parent_dir() {
		let temp = TempDir::new().unwrap();
		let config_path = temp.path().join(CONFIG_FILE_NAME);
		fs::write(&config_path, "namespace: testyaml").unwrap();

		let subdir = temp.path().join("manifests").join("web");
		fs::create_dir_all(&subdir).unwrap();

		let found = find_config_file(&subdir);
		// Compare file names only to avoid canonicalization issues on macOS
		assert!(found.is_some());
		assert_eq!(found.unwrap().file_name(), config_path.file_name());
	}

	#[test]
	fn test_no_config_found() {
		let temp = TempDir::new().unwrap();
		assert!(ToolConfig::load_from_directory(temp.path()).unwrap().is_none());
	}

	#[test]
	fn test_load_config_full() {
		let temp = TempDir::new().unwrap();
		let config_path = temp.path().join(CONFIG_FILE_NAME);
		fs::write(
			&config_path,
			indoc! {"
				kubeconfig: config/config
				context: staging
				namespace: testyaml
				namespaceSource: manifest
				pageSize: 50
				timeoutSeconds: 5
			"},
		)
		.unwrap();

		let config = ToolConfig::load_from_file(&config_path).unwrap();
		assert_eq!(
			config,
			ToolConfig {
				kubeconfig: Some(temp.path().join("config/config")),
				context: Some("staging".to_string()),
				namespace: Some("testyaml".to_string()),
				namespace_source: Some(NamespaceSource::Manifest),
				page_size: Some(50),
				timeout_seconds: Some(5),
			}
		);
	}

	#[test]
	fn test_load_config_empty_object() {
		let temp = TempDir::new().unwrap();
		let config_path = temp.path().join(CONFIG_FILE_NAME);
		fs::write(&config_path, "{}").unwrap();

		let config = ToolConfig::load_from_file(&config_path).unwrap();
		assert_eq!(config, ToolConfig::default());
	}

	#[test]
	fn test_load_config_malformed() {
		let temp = TempDir::new().unwrap();
		let config_path = temp.path().join(CONFIG_FILE_NAME);
		fs::write(&config_path, "pageSize: [not a number").unwrap();

		assert!(ToolConfig::load_from_file(&config_path).is_err());
	}

	#[test]
	fn test_merge_prefers_overrides() {
		let mut config = ToolConfig {
			namespace: Some("from-file".to_string()),
			page_size: Some(10),
			..ToolConfig::default()
		};
		config.merge_from(&ToolConfig {
			namespace: Some("from-flag".to_string()),
			..ToolConfig::default()
		});

		assert_eq!(config.namespace.as_deref(), Some("from-flag"));
		assert_eq!(config.page_size, Some(10));
	}
}
