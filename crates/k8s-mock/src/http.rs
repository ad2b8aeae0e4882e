//! HTTP-based mock Kubernetes server using wiremock.
//!
//! This provides a real HTTP server that can be used with actual kubeconfig-based
//! connections. Objects live in memory, keyed by collection path and name, so
//! lists come back in name order.

use std::{
	collections::BTreeMap,
	sync::{Arc, RwLock},
	time::Duration,
};

use bon::Builder;
use kube::config::{
	AuthInfo, Cluster, Context, Kubeconfig, NamedAuthInfo, NamedCluster, NamedContext,
};
use tracing::{debug, trace};
use wiremock::{
	matchers::{method, path_regex},
	Mock, MockServer, Request, ResponseTemplate,
};

use super::{
	catalog::{MockApiResource, MockCatalog},
	helpers::{parse_resource_path, status_response, ResourcePath},
};

/// Timestamp given to every object created through the mock.
pub const CREATION_TIMESTAMP: &str = "2024-01-01T00:00:00Z";

/// Stored objects and the counters used to stamp new ones.
#[derive(Default)]
pub struct MockState {
	/// `(collection path, name) -> object`
	objects: BTreeMap<(String, String), serde_json::Value>,
	next_uid: u64,
	resource_version: u64,
}

impl MockState {
	fn stamp(&mut self, object: &mut serde_json::Value) {
		self.next_uid += 1;
		self.resource_version += 1;
		let uid = format!("00000000-0000-4000-8000-{:012x}", self.next_uid);
		if let Some(meta) = object
			.get_mut("metadata")
			.and_then(serde_json::Value::as_object_mut)
		{
			meta.insert("uid".to_string(), uid.into());
			meta.insert(
				"resourceVersion".to_string(),
				self.resource_version.to_string().into(),
			);
			meta.insert(
				"creationTimestamp".to_string(),
				CREATION_TIMESTAMP.to_string().into(),
			);
		}
	}
}

/// Type alias for the shared mutable server state.
pub type SharedState = Arc<RwLock<MockState>>;

/// A mock Kubernetes server exposed over HTTP.
#[derive(Builder)]
pub struct HttpMockK8sServer {
	/// Objects present before the first request, as raw manifests. Their API
	/// paths are derived from apiVersion/kind using the catalog.
	#[builder(default)]
	resources: Vec<serde_json::Value>,
	/// Namespace set on the kubeconfig context.
	#[builder(into, default = "default".to_string())]
	namespace: String,
	/// Delay applied to every response.
	#[builder(default)]
	delay: Duration,
	#[builder(default)]
	catalog: MockCatalog,
}

/// A running HTTP mock server instance.
pub struct RunningHttpMockK8sServer {
	server: MockServer,
	state: SharedState,
	namespace: String,
}

impl HttpMockK8sServer {
	/// Start the mock server with all configured resources.
	pub async fn start(self) -> RunningHttpMockK8sServer {
		let server = MockServer::start().await;
		debug!(uri = %server.uri(), "Started mock K8s server");

		let mut state = MockState::default();
		for mut manifest in self.resources {
			if let Some((collection, name)) = key_for_manifest(&manifest, &self.catalog) {
				trace!(collection = %collection, name = %name, "Registered resource");
				state.stamp(&mut manifest);
				state.objects.insert((collection, name), manifest);
			}
		}

		let state = Arc::new(RwLock::new(state));
		let catalog = Arc::new(self.catalog);
		mount_resources(&server, &state, &catalog, self.delay).await;

		RunningHttpMockK8sServer {
			server,
			state,
			namespace: self.namespace,
		}
	}
}

/// Derive the storage key for a manifest using the catalog.
fn key_for_manifest(
	manifest: &serde_json::Value,
	catalog: &MockCatalog,
) -> Option<(String, String)> {
	let api_version = manifest.get("apiVersion")?.as_str()?;
	let kind = manifest.get("kind")?.as_str()?;
	let name = manifest.pointer("/metadata/name")?.as_str()?.to_string();
	let namespace = manifest
		.pointer("/metadata/namespace")
		.and_then(serde_json::Value::as_str);

	let resource = catalog.by_kind(api_version, kind)?;
	Some((resource.collection_path(namespace), name))
}

impl RunningHttpMockK8sServer {
	/// Get the server's URI (e.g., "http://127.0.0.1:12345").
	pub fn uri(&self) -> String {
		self.server.uri()
	}

	/// Create a Kubeconfig pointing to this mock server.
	pub fn kubeconfig(&self) -> Kubeconfig {
		self.kubeconfig_with_context("mock-context")
	}

	/// Create a Kubeconfig pointing to this mock server with a custom context name.
	pub fn kubeconfig_with_context(&self, context_name: &str) -> Kubeconfig {
		let cluster_name = "mock-cluster";
		let user_name = "mock-user";

		Kubeconfig {
			clusters: vec![NamedCluster {
				name: cluster_name.to_string(),
				cluster: Some(Cluster {
					server: Some(self.uri()),
					insecure_skip_tls_verify: Some(true),
					..Default::default()
				}),
			}],
			contexts: vec![NamedContext {
				name: context_name.to_string(),
				context: Some(Context {
					cluster: cluster_name.to_string(),
					user: Some(user_name.to_string()),
					namespace: Some(self.namespace.clone()),
					..Default::default()
				}),
			}],
			auth_infos: vec![NamedAuthInfo {
				name: user_name.to_string(),
				auth_info: Some(AuthInfo::default()),
			}],
			current_context: Some(context_name.to_string()),
			..Default::default()
		}
	}

	/// A stored object, looked up by collection path and name.
	pub fn object(&self, collection: &str, name: &str) -> Option<serde_json::Value> {
		let state = self.state.read().unwrap();
		state
			.objects
			.get(&(collection.to_string(), name.to_string()))
			.cloned()
	}

	/// Names stored under a collection path, in name order.
	pub fn names(&self, collection: &str) -> Vec<String> {
		let state = self.state.read().unwrap();
		state
			.objects
			.keys()
			.filter(|(c, _)| c == collection)
			.map(|(_, name)| name.clone())
			.collect()
	}

	/// Total number of stored objects.
	pub fn len(&self) -> usize {
		self.state.read().unwrap().objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Number of HTTP requests the server has received.
	pub async fn request_count(&self) -> usize {
		self.server
			.received_requests()
			.await
			.map(|requests| requests.len())
			.unwrap_or(0)
	}
}

fn is_dry_run(req: &Request) -> bool {
	req.url.query_pairs().any(|(key, _)| key == "dryRun")
}

fn query_param(req: &Request, name: &str) -> Option<String> {
	req.url
		.query_pairs()
		.find(|(key, _)| key == name)
		.map(|(_, value)| value.into_owned())
}

/// Resolve a request path against the catalog.
fn resolve<'a>(
	req: &Request,
	catalog: &'a MockCatalog,
) -> Result<(ResourcePath, &'a MockApiResource), ResponseTemplate> {
	let not_found = || {
		status_response(
			404,
			"NotFound",
			"the server could not find the requested resource",
		)
	};
	let parsed = parse_resource_path(req.url.path()).ok_or_else(not_found)?;
	let resource = catalog
		.by_plural(&parsed.group_version, &parsed.plural)
		.ok_or_else(not_found)?;
	// Cross-namespace collections are not served.
	if resource.namespaced != parsed.namespace.is_some() {
		return Err(not_found());
	}
	Ok((parsed, resource))
}

async fn mount_resources(
	server: &MockServer,
	state: &SharedState,
	catalog: &Arc<MockCatalog>,
	delay: Duration,
) {
	let post_state = Arc::clone(state);
	let post_catalog = Arc::clone(catalog);
	Mock::given(method("POST"))
		.and(path_regex(r"^/api(s)?/.*"))
		.respond_with(move |req: &Request| {
			handle_create(req, &post_state, &post_catalog).set_delay(delay)
		})
		.mount(server)
		.await;

	let get_state = Arc::clone(state);
	let get_catalog = Arc::clone(catalog);
	Mock::given(method("GET"))
		.and(path_regex(r"^/api(s)?/.*"))
		.respond_with(move |req: &Request| {
			handle_get(req, &get_state, &get_catalog).set_delay(delay)
		})
		.mount(server)
		.await;

	let delete_state = Arc::clone(state);
	let delete_catalog = Arc::clone(catalog);
	Mock::given(method("DELETE"))
		.and(path_regex(r"^/api(s)?/.*"))
		.respond_with(move |req: &Request| {
			handle_delete(req, &delete_state, &delete_catalog).set_delay(delay)
		})
		.mount(server)
		.await;
}

/// POST to a collection: store the body, stamped with server-owned metadata.
fn handle_create(req: &Request, state: &SharedState, catalog: &MockCatalog) -> ResponseTemplate {
	let (parsed, resource) = match resolve(req, catalog) {
		Ok(found) => found,
		Err(response) => return response,
	};
	if parsed.name.is_some() {
		return status_response(
			405,
			"MethodNotAllowed",
			"the server does not allow this method on the requested resource",
		);
	}

	let mut body: serde_json::Value = match serde_json::from_slice(&req.body) {
		Ok(body) => body,
		Err(e) => {
			return status_response(400, "BadRequest", &format!("invalid request body: {e}"))
		}
	};
	let kind = body.get("kind").and_then(serde_json::Value::as_str);
	let api_version = body.get("apiVersion").and_then(serde_json::Value::as_str);
	if kind != Some(resource.kind.as_str()) || api_version != Some(resource.group_version.as_str()) {
		return status_response(
			400,
			"BadRequest",
			"the API version in the data does not match the expected API version",
		);
	}

	let name = body
		.pointer("/metadata/name")
		.and_then(serde_json::Value::as_str)
		.unwrap_or("")
		.to_string();
	if name.is_empty() {
		let message = format!(
			"{} \"\" is invalid: metadata.name: Required value: name is required",
			resource.kind
		);
		return status_response(422, "Invalid", &message);
	}

	if resource.namespaced {
		let namespace = parsed.namespace.clone().unwrap_or_default();
		let body_namespace = body
			.pointer("/metadata/namespace")
			.and_then(serde_json::Value::as_str);
		if body_namespace.is_some_and(|ns| ns != namespace) {
			return status_response(
				400,
				"BadRequest",
				"the namespace of the provided object does not match the namespace sent on the request",
			);
		}
		if let Some(meta) = body
			.get_mut("metadata")
			.and_then(serde_json::Value::as_object_mut)
		{
			meta.insert("namespace".to_string(), namespace.into());
		}
	}

	let key = (resource.collection_path(parsed.namespace.as_deref()), name.clone());
	let mut state = state.write().unwrap();
	if state.objects.contains_key(&key) {
		let message = format!(
			"{} \"{}\" already exists",
			resource.qualified_name(),
			name
		);
		return status_response(409, "AlreadyExists", &message);
	}

	state.stamp(&mut body);
	if is_dry_run(req) {
		trace!(collection = %key.0, name = %name, "Dry-run create");
	} else {
		trace!(collection = %key.0, name = %name, "Created resource");
		state.objects.insert(key, body.clone());
	}
	ResponseTemplate::new(201).set_body_json(body)
}

/// GET an item, or a page of a collection honouring `limit` and `continue`.
fn handle_get(req: &Request, state: &SharedState, catalog: &MockCatalog) -> ResponseTemplate {
	let (parsed, resource) = match resolve(req, catalog) {
		Ok(found) => found,
		Err(response) => return response,
	};
	let collection = resource.collection_path(parsed.namespace.as_deref());
	let state = state.read().unwrap();

	if let Some(name) = parsed.name {
		return match state.objects.get(&(collection, name.clone())) {
			Some(object) => ResponseTemplate::new(200).set_body_json(object),
			None => not_found_object(resource, &name),
		};
	}

	let after = query_param(req, "continue").filter(|token| !token.is_empty());
	let limit = query_param(req, "limit")
		.and_then(|l| l.parse::<usize>().ok())
		.filter(|&l| l > 0);

	let mut remaining = state
		.objects
		.iter()
		.filter(|((c, _), _)| *c == collection)
		.filter(|((_, name), _)| after.as_ref().is_none_or(|after| name > after))
		.peekable();

	let mut items = Vec::new();
	let mut last_name = None;
	for ((_, name), object) in remaining.by_ref() {
		items.push(object.clone());
		last_name = Some(name.clone());
		if limit.is_some_and(|l| items.len() >= l) {
			break;
		}
	}
	let continue_token = match remaining.peek() {
		Some(_) => last_name,
		None => None,
	};

	let mut metadata =
		serde_json::json!({ "resourceVersion": state.resource_version.to_string() });
	if let Some(token) = continue_token {
		metadata["continue"] = token.into();
	}

	ResponseTemplate::new(200).set_body_json(serde_json::json!({
		"kind": format!("{}List", resource.kind),
		"apiVersion": resource.group_version,
		"metadata": metadata,
		"items": items
	}))
}

/// DELETE an item, returning the removed object.
fn handle_delete(req: &Request, state: &SharedState, catalog: &MockCatalog) -> ResponseTemplate {
	let (parsed, resource) = match resolve(req, catalog) {
		Ok(found) => found,
		Err(response) => return response,
	};
	let Some(name) = parsed.name else {
		return status_response(
			405,
			"MethodNotAllowed",
			"collection delete is not supported",
		);
	};
	let key = (resource.collection_path(parsed.namespace.as_deref()), name.clone());

	let mut state = state.write().unwrap();
	let removed = if is_dry_run(req) {
		state.objects.get(&key).cloned()
	} else {
		state.objects.remove(&key)
	};
	match removed {
		Some(object) => ResponseTemplate::new(200).set_body_json(object),
		None => not_found_object(resource, &name),
	}
}

fn not_found_object(resource: &MockApiResource, name: &str) -> ResponseTemplate {
	let message = format!("{} \"{}\" not found", resource.qualified_name(), name);
	status_response(404, "NotFound", &message)
}
