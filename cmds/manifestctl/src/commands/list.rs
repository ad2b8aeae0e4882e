//! List command handler.

use std::io::Write;

use anyhow::{Context, Result};
use clap::Args;
use tracing::instrument;

use super::{
	output::{write_list, ListFormat},
	util::{block_on, ConnectionArgs},
};
use crate::{
	client::ClusterClient,
	resource::{ResourceKind, ResourceList, ResourceScope},
};

#[derive(Args)]
pub struct ListArgs {
	/// Resource kind, e.g. `deployment`, `svc` or `StorageClass`
	pub kind: ResourceKind,

	/// Output format
	#[arg(short = 'o', long, value_enum, default_value = "table")]
	pub output: ListFormat,
}

/// Run the list command.
pub fn run<W: Write>(args: ListArgs, conn: &ConnectionArgs, writer: W) -> Result<()> {
	block_on(async {
		let client = conn.connect(false).await?;
		list_kind(&client, args.kind, args.output, writer).await?;
		anyhow::Ok(())
	})?
}

/// Fetch every object of `kind` and print it.
#[instrument(skip_all, fields(kind = %kind))]
pub async fn list_kind<W: Write>(
	client: &ClusterClient,
	kind: ResourceKind,
	format: ListFormat,
	writer: W,
) -> Result<ResourceList> {
	let scope = match kind.scope() {
		ResourceScope::Namespaced => format!("in namespace {}", client.namespace()),
		ResourceScope::ClusterWide => "cluster-wide".to_string(),
	};
	let list = kind
		.list(client)
		.await
		.with_context(|| format!("listing {kind} {scope}"))?;

	if list.is_empty() && format == ListFormat::Table {
		eprintln!("No {kind} resources found {scope}.");
	}
	write_list(&list, format, writer)?;
	Ok(list)
}
