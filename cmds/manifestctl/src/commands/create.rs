//! Create command handler.
//!
//! Loads a single manifest, decodes it by its `kind` and submits it to the
//! cluster. Nothing is sent when any local stage fails.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use clap::Args;
use tracing::instrument;

use super::{
	output::{write_resource, OutputFormat},
	util::{block_on, ConnectionArgs},
};
use crate::{client::ClusterClient, manifest, resource::Resource};

#[derive(Args)]
pub struct CreateArgs {
	/// Manifest file to create
	#[arg(short = 'f', long = "filename")]
	pub filename: std::path::PathBuf,

	/// Validate on the server without persisting anything
	#[arg(long)]
	pub dry_run: bool,

	/// Output format for the created object
	#[arg(short = 'o', long, value_enum, default_value = "name")]
	pub output: OutputFormat,
}

/// Run the create command.
pub fn run<W: Write>(args: CreateArgs, conn: &ConnectionArgs, writer: W) -> Result<()> {
	block_on(async {
		let client = conn.connect(args.dry_run).await?;
		create_from_file(&client, &args.filename, args.output, writer).await?;
		anyhow::Ok(())
	})?
}

/// Load, decode and create the object described by `path`.
///
/// Returns the object as stored by the server.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn create_from_file<W: Write>(
	client: &ClusterClient,
	path: &Path,
	output: OutputFormat,
	writer: W,
) -> Result<Resource> {
	let resource = manifest::load_resource(path)
		.with_context(|| format!("loading manifest {}", path.display()))?;
	let kind = resource.kind();
	let name = resource.name();

	let created = resource
		.create(client)
		.await
		.with_context(|| format!("creating {kind}/{name}"))?;

	write_resource(&created, output, writer)?;
	Ok(created)
}
