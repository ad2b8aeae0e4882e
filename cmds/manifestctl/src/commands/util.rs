//! Utilities for command handlers.

use std::{
	future::Future,
	io::{self, ErrorKind, Write},
	path::PathBuf,
};

use anyhow::{Context, Result};
use clap::Args;

use crate::{
	client::{ClusterClient, NamespaceSource},
	config::ToolConfig,
};

/// Connection flags shared by every subcommand that talks to the cluster.
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
	/// Path to a .manifestctl.yaml file. Searched upward from the working directory when unset
	#[arg(long, global = true)]
	pub config: Option<PathBuf>,

	/// Path to the kubeconfig file. Defaults to $KUBECONFIG or ~/.kube/config
	#[arg(long, global = true)]
	pub kubeconfig: Option<PathBuf>,

	/// Kubeconfig context to use instead of the current context
	#[arg(long, global = true)]
	pub context: Option<String>,

	/// Namespace for namespaced kinds. Defaults to the context's namespace
	#[arg(short = 'n', long, global = true)]
	pub namespace: Option<String>,

	/// Where created objects take their namespace from
	#[arg(long, value_enum, global = true)]
	pub namespace_source: Option<NamespaceSource>,

	/// Number of objects requested per list page
	#[arg(long, global = true)]
	pub page_size: Option<u32>,

	/// Per-request timeout in seconds
	#[arg(long, global = true)]
	pub timeout: Option<u64>,
}

impl ConnectionArgs {
	fn overrides(&self) -> ToolConfig {
		ToolConfig {
			kubeconfig: self.kubeconfig.clone(),
			context: self.context.clone(),
			namespace: self.namespace.clone(),
			namespace_source: self.namespace_source,
			page_size: self.page_size,
			timeout_seconds: self.timeout,
		}
	}

	/// Merge the config file (if any) with command-line flags.
	pub fn resolve(&self) -> Result<ToolConfig> {
		let mut config = match &self.config {
			Some(path) => ToolConfig::load_from_file(path)?,
			None => {
				let cwd = std::env::current_dir().context("resolving working directory")?;
				ToolConfig::load_from_directory(&cwd)?.unwrap_or_default()
			}
		};
		config.merge_from(&self.overrides());
		Ok(config)
	}

	/// Resolve configuration and build a cluster client.
	pub async fn connect(&self, dry_run: bool) -> Result<ClusterClient> {
		let config = self.resolve()?;
		let client =
			ClusterClient::connect(&config.connection_profile(), config.client_options(dry_run))
				.await?;
		Ok(client)
	}
}

/// Run a future to completion on a single-threaded runtime.
pub fn block_on<F: Future>(future: F) -> Result<F::Output> {
	let runtime = tokio::runtime::Builder::new_current_thread()
		.enable_all()
		.build()
		.context("creating tokio runtime")?;
	Ok(runtime.block_on(future))
}

/// A writer wrapper that silently handles broken pipe errors.
///
/// When the underlying writer returns a broken pipe error (EPIPE), this wrapper
/// converts it to a successful write. This allows commands to exit cleanly when
/// output is piped to a process that closes early (e.g., `manifestctl list deploy | head -1`).
pub struct BrokenPipeGuard<W> {
	inner: W,
}

impl<W> BrokenPipeGuard<W> {
	pub fn new(inner: W) -> Self {
		Self { inner }
	}
}

impl<W: Write> Write for BrokenPipeGuard<W> {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		match self.inner.write(buf) {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(buf.len()),
			other => other,
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		match self.inner.flush() {
			Err(e) if e.kind() == ErrorKind::BrokenPipe => Ok(()),
			other => other,
		}
	}
}
