//! Show command handler.
//!
//! Runs the local half of the pipeline (load, normalize, decode) and prints
//! the typed object. The cluster is never contacted.

use std::{io::Write, path::Path};

use anyhow::{Context, Result};
use clap::Args;

use super::output::{write_resource, OutputFormat};
use crate::{manifest, resource::Resource};

#[derive(Args)]
pub struct ShowArgs {
	/// Manifest file to decode
	#[arg(short = 'f', long = "filename")]
	pub filename: std::path::PathBuf,

	/// Output format
	#[arg(short = 'o', long, value_enum, default_value = "yaml")]
	pub output: OutputFormat,
}

pub fn run<W: Write>(args: ShowArgs, writer: W) -> Result<()> {
	show_file(&args.filename, args.output, writer)?;
	Ok(())
}

pub fn show_file<W: Write>(path: &Path, output: OutputFormat, writer: W) -> Result<Resource> {
	let resource = manifest::load_resource(path)
		.with_context(|| format!("loading manifest {}", path.display()))?;
	write_resource(&resource, output, writer)?;
	Ok(resource)
}
