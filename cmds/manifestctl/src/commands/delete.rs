//! Delete command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use tracing::instrument;

use super::util::{block_on, ConnectionArgs};
use crate::{client::ClusterClient, resource::ResourceKind};

#[derive(Args)]
pub struct DeleteArgs {
	/// Resource kind, e.g. `deployment`, `svc` or `StorageClass`
	pub kind: ResourceKind,

	/// Name of the object to delete
	pub name: String,

	/// Validate on the server without deleting anything
	#[arg(long)]
	pub dry_run: bool,
}

/// Run the delete command.
pub fn run<W: Write>(args: DeleteArgs, conn: &ConnectionArgs, writer: W) -> Result<()> {
	block_on(async {
		let client = conn.connect(args.dry_run).await?;
		delete_named(&client, args.kind, &args.name, writer).await?;
		anyhow::Ok(())
	})?
}

/// Delete one object and report it.
#[instrument(skip_all, fields(kind = %kind, name = name))]
pub async fn delete_named<W: Write>(
	client: &ClusterClient,
	kind: ResourceKind,
	name: &str,
	mut writer: W,
) -> Result<()> {
	kind.delete(client, name)
		.await
		.with_context(|| format!("deleting {kind}/{name}"))?;

	let suffix = if client.dry_run() { " (dry run)" } else { "" };
	writeln!(writer, "{}/{} deleted{}", kind.as_str().to_lowercase(), name, suffix)?;
	Ok(())
}
