//! Manifest loading pipeline: file bytes → canonical JSON → typed resource.
//!
//! Each stage is a plain function so it can be tested (and fuzzed) on its own.
//! Failures are logged where they happen and returned unchanged; nothing in
//! this module retries or recovers.

use std::{cell::Cell, fmt, path::Path};

use serde::de::{self, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Number, Value};
use thiserror::Error;
use tracing::{error, instrument};

use crate::{
	error::{Error, Result},
	resource::{ManagedKind, Resource, ResourceKind},
};

/// Reasons the markup could not be turned into canonical JSON.
#[derive(Debug, Error)]
pub enum FormatError {
	#[error("manifest is not valid UTF-8")]
	Encoding(#[source] std::str::Utf8Error),

	#[error(transparent)]
	Syntax(#[from] serde_yaml_with_quirks::Error),

	#[error("manifest is empty")]
	Empty,

	#[error("manifest contains more than one document")]
	MultipleDocuments,

	#[error("manifest expands to more than {limit} nodes through aliases")]
	ExcessiveAliasing { limit: usize },

	#[error("encoding manifest as JSON")]
	Encode(#[source] serde_json::Error),
}

/// Read a manifest file. A single attempt, no retries.
#[instrument]
pub fn load(path: &Path) -> Result<Vec<u8>> {
	std::fs::read(path)
		.map_err(|source| Error::Io {
			path: path.to_path_buf(),
			source,
		})
		.inspect_err(|e| error!(error = %e, "failed to read manifest"))
}

/// Convert YAML markup into compact canonical JSON bytes.
///
/// Comments, anchors and block scalars are resolved here. Exactly one
/// non-empty document is accepted.
#[instrument(skip_all, fields(len = bytes.len()))]
pub fn normalize(bytes: &[u8]) -> Result<Vec<u8>> {
	normalize_inner(bytes)
		.map_err(Error::Format)
		.inspect_err(|e| error!(error = ?e, "failed to normalize manifest"))
}

/// Upper bound on the nodes one manifest may expand to, aliases included.
pub const MAX_NODES: usize = 250_000;

fn normalize_inner(bytes: &[u8]) -> Result<Vec<u8>, FormatError> {
	let text = std::str::from_utf8(bytes).map_err(FormatError::Encoding)?;
	if text.trim().is_empty() {
		return Err(FormatError::Empty);
	}

	let budget = NodeBudget::new(MAX_NODES);
	let mut found: Option<Value> = None;
	for document in serde_yaml_with_quirks::Deserializer::from_str(text) {
		let value = ValueSeed { budget: &budget }
			.deserialize(document)
			.map_err(|e| budget.classify(e))?;
		// Empty documents, e.g. after a trailing `---`, count as absent.
		if value.is_null() {
			continue;
		}
		if found.is_some() {
			return Err(FormatError::MultipleDocuments);
		}
		found = Some(value);
	}

	let value = found.ok_or(FormatError::Empty)?;
	serde_json::to_vec(&value).map_err(FormatError::Encode)
}

/// Counts nodes as they are built, so alias expansion cannot grow without bound.
struct NodeBudget {
	limit: usize,
	used: Cell<usize>,
}

impl NodeBudget {
	fn new(limit: usize) -> Self {
		Self {
			limit,
			used: Cell::new(0),
		}
	}

	fn take<E: de::Error>(&self) -> Result<(), E> {
		let used = self.used.get() + 1;
		self.used.set(used);
		if used > self.limit {
			return Err(E::custom(format_args!("more than {} nodes", self.limit)));
		}
		Ok(())
	}

	fn exhausted(&self) -> bool {
		self.used.get() > self.limit
	}

	fn classify(&self, error: serde_yaml_with_quirks::Error) -> FormatError {
		if self.exhausted() {
			FormatError::ExcessiveAliasing { limit: self.limit }
		} else {
			FormatError::Syntax(error)
		}
	}
}

#[derive(Clone, Copy)]
struct ValueSeed<'b> {
	budget: &'b NodeBudget,
}

impl<'de> DeserializeSeed<'de> for ValueSeed<'_> {
	type Value = Value;

	fn deserialize<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
		self.budget.take::<D::Error>()?;
		deserializer.deserialize_any(self)
	}
}

impl<'de> Visitor<'de> for ValueSeed<'_> {
	type Value = Value;

	fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str("any YAML value")
	}

	fn visit_bool<E>(self, v: bool) -> Result<Value, E> {
		Ok(Value::Bool(v))
	}

	fn visit_i64<E>(self, v: i64) -> Result<Value, E> {
		Ok(Value::Number(v.into()))
	}

	fn visit_u64<E>(self, v: u64) -> Result<Value, E> {
		Ok(Value::Number(v.into()))
	}

	fn visit_f64<E>(self, v: f64) -> Result<Value, E> {
		Ok(Number::from_f64(v).map_or(Value::Null, Value::Number))
	}

	fn visit_str<E>(self, v: &str) -> Result<Value, E> {
		Ok(Value::String(v.to_string()))
	}

	fn visit_string<E>(self, v: String) -> Result<Value, E> {
		Ok(Value::String(v))
	}

	fn visit_unit<E>(self) -> Result<Value, E> {
		Ok(Value::Null)
	}

	fn visit_none<E>(self) -> Result<Value, E> {
		Ok(Value::Null)
	}

	fn visit_some<D: de::Deserializer<'de>>(self, deserializer: D) -> Result<Value, D::Error> {
		self.deserialize(deserializer)
	}

	fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Value, A::Error> {
		let mut items = Vec::new();
		while let Some(item) = seq.next_element_seed(self)? {
			items.push(item);
		}
		Ok(Value::Array(items))
	}

	fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Value, A::Error> {
		let mut object = Map::new();
		while let Some(key) = map.next_key::<String>()? {
			let value = map.next_value_seed(self)?;
			object.insert(key, value);
		}
		Ok(Value::Object(object))
	}
}

/// Decode canonical JSON as a known resource type.
///
/// Decoding is lenient: fields the type does not know are dropped and absent
/// fields take their default. A document of the wrong shape, or one whose
/// `apiVersion`/`kind` name a different type, is rejected.
#[instrument(skip_all, fields(kind = %K::KIND))]
pub fn decode<K: ManagedKind>(canonical: &[u8]) -> Result<K> {
	serde_json::from_slice(canonical)
		.map_err(|source| Error::Decode {
			kind: K::KIND,
			source,
		})
		.inspect_err(|e| error!(error = ?e, "failed to decode manifest"))
}

/// Decode canonical JSON, picking the variant from its `kind` field.
#[instrument(skip_all)]
pub fn decode_any(canonical: &[u8]) -> Result<Resource> {
	kind_of(canonical)
		.inspect_err(|e| error!(error = %e, "failed to determine manifest kind"))?
		.decode(canonical)
}

fn kind_of(canonical: &[u8]) -> Result<ResourceKind> {
	let value: serde_json::Value = serde_json::from_slice(canonical).map_err(Error::Canonical)?;
	let kind = value
		.get("kind")
		.and_then(serde_json::Value::as_str)
		.ok_or(Error::MissingKind)?;
	ResourceKind::from_kind_field(kind).ok_or_else(|| Error::UnknownKind(kind.to_string()))
}

/// Full pipeline for one manifest file.
pub fn load_resource(path: &Path) -> Result<Resource> {
	let raw = load(path)?;
	let canonical = normalize(&raw)?;
	decode_any(&canonical)
}

#[cfg(test)]
mod tests {
	use assert_matches::assert_matches;
	use indoc::indoc;
	use k8s_openapi::api::{
		apps::v1::Deployment,
		core::v1::{Namespace, Service},
		storage::v1::StorageClass,
	};

	use super::*;
	use crate::error::ErrorKind;

	fn pipeline(yaml: &str) -> Result<Resource> {
		decode_any(&normalize(yaml.as_bytes())?)
	}

	#[test]
	fn test_normalize_resolves_anchors_and_comments() {
		let yaml = indoc! {"
			# shared labels
			base: &labels
			  app: web
			metadata:
			  labels: *labels
			script: |
			  echo one
			  echo two
		"};
		let canonical = normalize(yaml.as_bytes()).unwrap();
		let value: serde_json::Value = serde_json::from_slice(&canonical).unwrap();
		assert_eq!(
			value,
			serde_json::json!({
				"base": {"app": "web"},
				"metadata": {"labels": {"app": "web"}},
				"script": "echo one\necho two\n",
			})
		);
	}

	#[test]
	fn test_normalize_unterminated_string() {
		let err = normalize(b"metadata:\n  name: \"web\n").unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Format);
	}

	#[test]
	fn test_normalize_unclosed_flow_sequence() {
		let err = normalize(b"ports: [80, 443\n").unwrap_err();
		assert_matches!(err, Error::Format(FormatError::Syntax(_)));
	}

	#[test]
	fn test_normalize_invalid_utf8() {
		let err = normalize(&[b'a', b':', b' ', 0xff, 0xfe]).unwrap_err();
		assert_matches!(err, Error::Format(FormatError::Encoding(_)));
	}

	#[test]
	fn test_normalize_empty_document() {
		assert_matches!(
			normalize(b"# nothing here\n"),
			Err(Error::Format(FormatError::Empty) | Error::Format(FormatError::Syntax(_)))
		);
		assert_matches!(normalize(b"  \n"), Err(Error::Format(FormatError::Empty)));
	}

	#[test]
	fn test_normalize_rejects_multiple_documents() {
		let yaml = "kind: Namespace\n---\nkind: Namespace\n";
		let err = normalize(yaml.as_bytes()).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Format);
		assert_matches!(err, Error::Format(FormatError::MultipleDocuments));
	}

	#[test]
	fn test_normalize_ignores_empty_documents_around_manifest() {
		for yaml in [
			"apiVersion: v1\nkind: Namespace\nmetadata:\n  name: a\n---\n",
			"---\napiVersion: v1\nkind: Namespace\nmetadata:\n  name: a\n",
			"---\napiVersion: v1\nkind: Namespace\nmetadata:\n  name: a\n---\n---\n",
		] {
			let resource = pipeline(yaml).unwrap();
			assert_eq!(resource.kind(), ResourceKind::Namespace);
			assert_eq!(resource.name(), "a");
		}
		assert_matches!(normalize(b"---\n---\n"), Err(Error::Format(FormatError::Empty)));
	}

	#[test]
	fn test_normalize_stops_alias_expansion() {
		// Nine levels of ten references each would expand to 10^9 scalars.
		let mut yaml = String::from("a0: &a0 [x, x, x, x, x, x, x, x, x, x]\n");
		for level in 1..9 {
			let refs = vec![format!("*a{}", level - 1); 10].join(", ");
			yaml.push_str(&format!("a{level}: &a{level} [{refs}]\n"));
		}
		let err = normalize(yaml.as_bytes()).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Format);
		assert_matches!(
			err,
			Error::Format(FormatError::ExcessiveAliasing { limit: MAX_NODES })
		);
	}

	#[test]
	fn test_normalize_keeps_key_order() {
		let canonical = normalize(b"kind: Namespace\napiVersion: v1\nmetadata:\n  name: a\n").unwrap();
		assert_eq!(
			canonical,
			br#"{"kind":"Namespace","apiVersion":"v1","metadata":{"name":"a"}}"#
		);
	}

	#[test]
	fn test_decode_deployment_fields() {
		let yaml = indoc! {"
			apiVersion: apps/v1
			kind: Deployment
			metadata:
			  name: web
			  namespace: testyaml
			  labels:
			    app: web
			spec:
			  replicas: 3
			  selector:
			    matchLabels:
			      app: web
			  template:
			    metadata:
			      labels:
			        app: web
			    spec:
			      containers:
			        - name: nginx
			          image: nginx:1.25
		"};
		let deployment: Deployment = decode(&normalize(yaml.as_bytes()).unwrap()).unwrap();
		assert_eq!(deployment.metadata.name.as_deref(), Some("web"));
		assert_eq!(deployment.metadata.namespace.as_deref(), Some("testyaml"));
		let spec = deployment.spec.unwrap();
		assert_eq!(spec.replicas, Some(3));
		let containers = spec.template.spec.unwrap().containers;
		assert_eq!(containers[0].image.as_deref(), Some("nginx:1.25"));
	}

	#[test]
	fn test_decode_missing_fields_take_defaults() {
		let ns: Namespace = decode(br#"{"kind":"Namespace"}"#).unwrap();
		assert_eq!(ns.metadata.name, None);
		assert_eq!(ns.spec, None);
	}

	#[test]
	fn test_decode_drops_unknown_fields() {
		let yaml = indoc! {"
			apiVersion: v1
			kind: Service
			metadata:
			  name: web
			  futureField: 1
			spec:
			  ports:
			    - port: 80
			      shinyNewOption: true
			topLevelExtra: [1, 2, 3]
		"};
		let svc: Service = decode(&normalize(yaml.as_bytes()).unwrap()).unwrap();
		assert_eq!(svc.metadata.name.as_deref(), Some("web"));
		assert_eq!(svc.spec.unwrap().ports.unwrap()[0].port, 80);
	}

	#[test]
	fn test_decode_type_mismatch() {
		let err = decode::<Deployment>(br#""just a string""#).unwrap_err();
		assert_matches!(
			err,
			Error::Decode {
				kind: ResourceKind::Deployment,
				..
			}
		);
	}

	#[test]
	fn test_decode_wrong_kind_is_rejected() {
		let err = decode::<StorageClass>(br#"{"apiVersion":"v1","kind":"Namespace"}"#).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Decode);
	}

	#[test]
	fn test_decode_any_dispatches_on_kind() {
		let resource = pipeline(indoc! {"
			apiVersion: storage.k8s.io/v1
			kind: StorageClass
			metadata:
			  name: fast
			provisioner: kubernetes.io/no-provisioner
			volumeBindingMode: WaitForFirstConsumer
		"})
		.unwrap();
		assert_eq!(resource.kind(), ResourceKind::StorageClass);
		assert_eq!(resource.name(), "fast");
		assert_matches!(resource, Resource::StorageClass(sc) if sc.provisioner == "kubernetes.io/no-provisioner");
	}

	#[test]
	fn test_decode_any_missing_kind() {
		assert_matches!(
			pipeline("metadata:\n  name: web\n"),
			Err(Error::MissingKind)
		);
		assert_matches!(pipeline("- a\n- b\n"), Err(Error::MissingKind));
	}

	#[test]
	fn test_decode_any_unknown_kind() {
		assert_matches!(
			pipeline("apiVersion: v1\nkind: Pod\n"),
			Err(Error::UnknownKind(kind)) if kind == "Pod"
		);
	}

	#[test]
	fn test_load_missing_file() {
		let dir = tempfile::tempdir().unwrap();
		let err = load(&dir.path().join("absent.yaml")).unwrap_err();
		assert_eq!(err.kind(), ErrorKind::Io);
	}

	#[test]
	fn test_load_resource_from_file() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("namespace.yaml");
		std::fs::write(&path, "apiVersion: v1\nkind: Namespace\nmetadata:\n  name: testyaml\n")
			.unwrap();
		let resource = load_resource(&path).unwrap();
		assert_eq!(resource.kind(), ResourceKind::Namespace);
		assert_eq!(resource.name(), "testyaml");
	}
}
