//! Rendering of resources and lists for the terminal.

use std::io::Write;

use anyhow::{Context, Result};
use clap::ValueEnum;
use tabwriter::TabWriter;

use crate::resource::{Resource, ResourceList, ResourceScope};

/// Output format for a single object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
	#[default]
	Yaml,
	Json,
	/// Only `kind/name`.
	Name,
}

/// Output format for list results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ListFormat {
	#[default]
	Table,
	Name,
	Yaml,
	Json,
}

fn write_document<W: Write>(value: &serde_json::Value, json: bool, mut writer: W) -> Result<()> {
	if json {
		serde_json::to_writer_pretty(&mut writer, value).context("serializing JSON output")?;
		writeln!(writer)?;
	} else {
		let yaml = serde_yaml_with_quirks::to_string(value).context("serializing YAML output")?;
		writer.write_all(yaml.as_bytes())?;
		if !yaml.ends_with('\n') {
			writeln!(writer)?;
		}
	}
	Ok(())
}

pub fn write_resource<W: Write>(resource: &Resource, format: OutputFormat, mut writer: W) -> Result<()> {
	match format {
		OutputFormat::Name => {
			writeln!(writer, "{}/{}", resource.kind().as_str().to_lowercase(), resource.name())?;
			Ok(())
		}
		OutputFormat::Yaml | OutputFormat::Json => {
			let value = resource.to_json().context("serializing resource")?;
			write_document(&value, format == OutputFormat::Json, writer)
		}
	}
}

pub fn write_list<W: Write>(list: &ResourceList, format: ListFormat, mut writer: W) -> Result<()> {
	match format {
		ListFormat::Table => write_table(list, writer),
		ListFormat::Name => {
			let kind = list.kind().as_str().to_lowercase();
			for name in list.names() {
				writeln!(writer, "{kind}/{name}")?;
			}
			Ok(())
		}
		ListFormat::Yaml | ListFormat::Json => {
			let items = list.to_json().context("serializing resources")?;
			let value = serde_json::json!({
				"apiVersion": "v1",
				"kind": "List",
				"items": items,
			});
			write_document(&value, format == ListFormat::Json, writer)
		}
	}
}

fn write_table<W: Write>(list: &ResourceList, writer: W) -> Result<()> {
	if list.is_empty() {
		return Ok(());
	}

	let namespaced = list.kind().scope() == ResourceScope::Namespaced;
	let mut tw = TabWriter::new(writer).padding(3);

	if namespaced {
		writeln!(tw, "NAMESPACE\tNAME\tCREATED")?;
	} else {
		writeln!(tw, "NAME\tCREATED")?;
	}
	for row in list.rows() {
		let created = row.created.as_deref().unwrap_or("<unknown>");
		if namespaced {
			let namespace = row.namespace.as_deref().unwrap_or("");
			writeln!(tw, "{}\t{}\t{}", namespace, row.name, created)?;
		} else {
			writeln!(tw, "{}\t{}", row.name, created)?;
		}
	}
	tw.flush()?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use k8s_openapi::{
		api::{apps::v1::Deployment, storage::v1::StorageClass},
		apimachinery::pkg::apis::meta::v1::ObjectMeta,
	};

	use super::*;

	fn deployment(namespace: &str, name: &str) -> Deployment {
		Deployment {
			metadata: ObjectMeta {
				name: Some(name.to_string()),
				namespace: Some(namespace.to_string()),
				..Default::default()
			},
			..Default::default()
		}
	}

	#[test]
	fn test_table_for_namespaced_kind() {
		let list = ResourceList::Deployment(vec![
			deployment("testyaml", "web"),
			deployment("testyaml", "api-server"),
		]);
		let mut out = Vec::new();
		write_list(&list, ListFormat::Table, &mut out).unwrap();

		let out = String::from_utf8(out).unwrap();
		let lines: Vec<_> = out.lines().collect();
		assert_eq!(lines.len(), 3);
		assert!(lines[0].starts_with("NAMESPACE"));
		assert!(lines[1].starts_with("testyaml"));
		assert!(lines[2].contains("api-server"));
	}

	#[test]
	fn test_table_for_cluster_kind_has_no_namespace_column() {
		let list = ResourceList::StorageClass(vec![StorageClass {
			metadata: ObjectMeta {
				name: Some("fast".to_string()),
				..Default::default()
			},
			provisioner: "example.com/fast".to_string(),
			..Default::default()
		}]);
		let mut out = Vec::new();
		write_list(&list, ListFormat::Table, &mut out).unwrap();

		let out = String::from_utf8(out).unwrap();
		assert!(out.starts_with("NAME"));
		assert!(out.contains("fast"));
	}

	#[test]
	fn test_names_output() {
		let list = ResourceList::Deployment(vec![deployment("a", "web")]);
		let mut out = Vec::new();
		write_list(&list, ListFormat::Name, &mut out).unwrap();
		assert_eq!(String::from_utf8(out).unwrap(), "deployment/web\n");
	}

	#[test]
	fn test_json_list_wraps_items() {
		let list = ResourceList::Deployment(vec![deployment("a", "web")]);
		let mut out = Vec::new();
		write_list(&list, ListFormat::Json, &mut out).unwrap();

		let value: serde_json::Value = serde_json::from_slice(&out).unwrap();
		assert_eq!(value["kind"], "List");
		assert_eq!(value["items"][0]["metadata"]["name"], "web");
		assert_eq!(value["items"][0]["kind"], "Deployment");
	}

	#[test]
	fn test_resource_yaml_output() {
		let resource = Resource::Deployment(deployment("testyaml", "web"));
		let mut out = Vec::new();
		write_resource(&resource, OutputFormat::Yaml, &mut out).unwrap();

		let out = String::from_utf8(out).unwrap();
		assert!(out.contains("kind: Deployment"));
		assert!(out.contains("name: web"));
	}
}
