//! Request path parsing and API status bodies.

use wiremock::ResponseTemplate;

/// A request path split into its API coordinates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
	pub group_version: String,
	pub namespace: Option<String>,
	pub plural: String,
	/// `None` for collection requests.
	pub name: Option<String>,
}

/// Parse a Kubernetes API path.
///
/// Examples:
/// - `/api/v1/namespaces/my-ns` -> namespaces item `my-ns`
/// - `/apis/apps/v1/namespaces/default/deployments` -> deployments collection in `default`
/// - `/apis/storage.k8s.io/v1/storageclasses/fast` -> storageclasses item `fast`
pub fn parse_resource_path(path: &str) -> Option<ResourcePath> {
	let segments: Vec<&str> = path
		.trim_matches('/')
		.split('/')
		.filter(|s| !s.is_empty())
		.collect();

	let (group_version, rest) = match segments.as_slice() {
		["api", version, rest @ ..] => (version.to_string(), rest),
		["apis", group, version, rest @ ..] => (format!("{group}/{version}"), rest),
		_ => return None,
	};

	let (namespace, plural, name) = match rest {
		[plural] => (None, *plural, None),
		[plural, name] => (None, *plural, Some(*name)),
		["namespaces", ns, plural] => (Some(*ns), *plural, None),
		["namespaces", ns, plural, name] => (Some(*ns), *plural, Some(*name)),
		_ => return None,
	};

	Some(ResourcePath {
		group_version,
		namespace: namespace.map(str::to_string),
		plural: plural.to_string(),
		name: name.map(str::to_string),
	})
}

/// A `Status` failure response, as the API server sends for rejected calls.
pub fn status_response(code: u16, reason: &str, message: &str) -> ResponseTemplate {
	ResponseTemplate::new(code).set_body_json(serde_json::json!({
		"kind": "Status",
		"apiVersion": "v1",
		"metadata": {},
		"status": "Failure",
		"message": message,
		"reason": reason,
		"code": code
	}))
}
