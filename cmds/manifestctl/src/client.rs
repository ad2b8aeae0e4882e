//! Kubernetes cluster connection management.

use std::{
	path::{Path, PathBuf},
	time::Duration,
};

use bon::Builder;
use clap::ValueEnum;
use kube::{
	config::{KubeConfigOptions, Kubeconfig, KubeconfigError},
	Client, Config,
};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

/// Default timeout for Kubernetes API requests.
pub const DEFAULT_API_TIMEOUT: Duration = Duration::from_secs(30);

/// Default number of objects requested per list page.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Errors that can occur when connecting to a Kubernetes cluster.
#[derive(Debug, Error)]
pub enum ConnectionError {
	#[error("no context named `{0}` was found. Please check your kubeconfig")]
	ContextNotFound(String),

	#[error("namespace must not be empty")]
	EmptyNamespace,

	#[error(transparent)]
	Kubeconfig(#[from] KubeconfigError),

	#[error(transparent)]
	Kube(#[from] kube::Error),
}

/// Where namespaced objects get their namespace from on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NamespaceSource {
	/// Always use the client's namespace; `metadata.namespace` in the manifest is overwritten.
	#[default]
	Client,

	/// Honour `metadata.namespace` from the manifest, falling back to the client's namespace.
	Manifest,
}

/// Where to find cluster credentials.
#[derive(Debug, Clone, Default)]
pub struct ConnectionProfile {
	/// Explicit kubeconfig path. `$KUBECONFIG` / `~/.kube/config` when unset.
	pub kubeconfig: Option<PathBuf>,
	/// Context to use instead of `current-context`.
	pub context: Option<String>,
}

impl ConnectionProfile {
	pub fn read_kubeconfig(&self) -> Result<Kubeconfig, ConnectionError> {
		let kubeconfig = match &self.kubeconfig {
			Some(path) => Kubeconfig::read_from(path)?,
			None => Kubeconfig::read()?,
		};
		Ok(kubeconfig)
	}

	pub fn kubeconfig_path(&self) -> Option<&Path> {
		self.kubeconfig.as_deref()
	}
}

/// Per-client behaviour shared by every operation issued through it.
#[derive(Debug, Clone, Builder)]
pub struct ClientOptions {
	/// Default namespace. Taken from the kubeconfig context when unset.
	namespace: Option<String>,
	#[builder(default)]
	namespace_source: NamespaceSource,
	#[builder(default = DEFAULT_PAGE_SIZE)]
	page_size: u32,
	#[builder(default = DEFAULT_API_TIMEOUT)]
	timeout: Duration,
	/// Ask the server to validate writes without persisting them.
	#[builder(default)]
	dry_run: bool,
}

impl Default for ClientOptions {
	fn default() -> Self {
		Self::builder().build()
	}
}

/// An authenticated handle to one cluster, scoped to one default namespace.
///
/// Read-only after construction; operations borrow it.
#[derive(Clone)]
pub struct ClusterClient {
	client: Client,
	namespace: String,
	namespace_source: NamespaceSource,
	page_size: u32,
	timeout: Duration,
	dry_run: bool,
	/// Human-readable identifier for the cluster (context name or API server URL).
	cluster_identifier: String,
}

impl std::fmt::Debug for ClusterClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ClusterClient")
			.field("cluster_identifier", &self.cluster_identifier)
			.field("namespace", &self.namespace)
			.field("namespace_source", &self.namespace_source)
			.finish_non_exhaustive()
	}
}

impl ClusterClient {
	/// Build a client from a connection profile.
	///
	/// Credentials are validated and the transport is built, but the API
	/// server is not contacted.
	#[instrument(skip_all, fields(kubeconfig = ?profile.kubeconfig_path(), context = ?profile.context))]
	pub async fn connect(
		profile: &ConnectionProfile,
		options: ClientOptions,
	) -> Result<Self, ConnectionError> {
		let kubeconfig = profile
			.read_kubeconfig()
			.inspect_err(|e| tracing::error!(error = %e, "failed to load kubeconfig"))?;
		Self::from_kubeconfig(kubeconfig, profile.context.as_deref(), options).await
	}

	/// Build a client from an already loaded kubeconfig.
	#[instrument(skip_all, fields(context = ?context))]
	pub async fn from_kubeconfig(
		kubeconfig: Kubeconfig,
		context: Option<&str>,
		options: ClientOptions,
	) -> Result<Self, ConnectionError> {
		if options.namespace.as_deref() == Some("") {
			return Err(ConnectionError::EmptyNamespace);
		}

		if let Some(name) = context {
			if !kubeconfig.contexts.iter().any(|c| c.name == name) {
				return Err(ConnectionError::ContextNotFound(name.to_string()));
			}
		}

		let context_name = context
			.map(str::to_string)
			.or_else(|| kubeconfig.current_context.clone());

		let mut config = Config::from_custom_kubeconfig(
			kubeconfig,
			&KubeConfigOptions {
				context: context.map(str::to_string),
				..Default::default()
			},
		)
		.await
		.inspect_err(|e| tracing::error!(error = %e, "invalid kubeconfig"))?;

		let cluster_identifier = match context_name {
			Some(name) => format!("{}  (context:{})", config.cluster_url, name),
			None => config.cluster_url.to_string(),
		};

		apply_timeouts(&mut config, options.timeout);
		let client = Client::try_from(config)
			.inspect_err(|e| tracing::error!(error = %e, "failed to build cluster transport"))?;

		let mut this = Self::from_client(client, options);
		this.cluster_identifier = cluster_identifier;
		tracing::debug!(cluster = %this.cluster_identifier, namespace = %this.namespace, "cluster client ready");
		Ok(this)
	}

	/// Wrap an existing kube client, e.g. one backed by a test transport.
	pub fn from_client(client: Client, options: ClientOptions) -> Self {
		let namespace = options
			.namespace
			.unwrap_or_else(|| client.default_namespace().to_string());
		Self {
			client,
			namespace,
			namespace_source: options.namespace_source,
			page_size: options.page_size.max(1),
			timeout: options.timeout,
			dry_run: options.dry_run,
			cluster_identifier: "in-process".to_string(),
		}
	}

	/// Get a reference to the underlying kube client.
	pub fn client(&self) -> &Client {
		&self.client
	}

	/// Default namespace for namespaced operations.
	pub fn namespace(&self) -> &str {
		&self.namespace
	}

	pub fn namespace_source(&self) -> NamespaceSource {
		self.namespace_source
	}

	/// Resolve the namespace a namespaced object is created in.
	pub fn namespace_for(&self, manifest_namespace: Option<&str>) -> String {
		match (self.namespace_source, manifest_namespace) {
			(NamespaceSource::Manifest, Some(ns)) if !ns.is_empty() => ns.to_string(),
			_ => self.namespace.clone(),
		}
	}

	pub fn page_size(&self) -> u32 {
		self.page_size
	}

	pub fn timeout(&self) -> Duration {
		self.timeout
	}

	pub fn dry_run(&self) -> bool {
		self.dry_run
	}

	/// Get the cluster identifier (context name or API server URL).
	pub fn cluster_identifier(&self) -> &str {
		&self.cluster_identifier
	}
}

/// Connection setup is bounded by `timeout`. Reads and writes are bounded
/// only by the per-call deadline in `ops`.
fn apply_timeouts(config: &mut Config, timeout: Duration) {
	config.connect_timeout = Some(timeout);
	config.read_timeout = None;
	config.write_timeout = None;
}
