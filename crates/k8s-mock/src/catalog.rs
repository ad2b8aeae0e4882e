//! Resource kinds the mock server knows how to store.

/// One servable resource type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockApiResource {
	/// `v1` for the core group, `group/version` otherwise.
	pub group_version: String,
	/// Plural path segment, e.g. `deployments`.
	pub plural: String,
	pub kind: String,
	pub namespaced: bool,
}

impl MockApiResource {
	pub fn namespaced(group_version: &str, plural: &str, kind: &str) -> Self {
		Self {
			group_version: group_version.to_string(),
			plural: plural.to_string(),
			kind: kind.to_string(),
			namespaced: true,
		}
	}

	pub fn cluster_scoped(group_version: &str, plural: &str, kind: &str) -> Self {
		Self {
			group_version: group_version.to_string(),
			plural: plural.to_string(),
			kind: kind.to_string(),
			namespaced: false,
		}
	}

	/// API path prefix, `/api/v1` or `/apis/<group>/<version>`.
	pub fn prefix(&self) -> String {
		if self.group_version.contains('/') {
			format!("/apis/{}", self.group_version)
		} else {
			format!("/api/{}", self.group_version)
		}
	}

	/// Collection path for objects in `namespace` (ignored for cluster-scoped kinds).
	pub fn collection_path(&self, namespace: Option<&str>) -> String {
		match (self.namespaced, namespace) {
			(true, Some(ns)) => format!("{}/namespaces/{}/{}", self.prefix(), ns, self.plural),
			(true, None) => format!("{}/namespaces/default/{}", self.prefix(), self.plural),
			(false, _) => format!("{}/{}", self.prefix(), self.plural),
		}
	}

	/// `plural.group` as used in API status messages.
	pub fn qualified_name(&self) -> String {
		match self.group_version.split_once('/') {
			Some((group, _)) => format!("{}.{}", self.plural, group),
			None => self.plural.clone(),
		}
	}
}

/// The set of resource types served by a mock server.
#[derive(Debug, Clone)]
pub struct MockCatalog {
	pub resources: Vec<MockApiResource>,
}

impl Default for MockCatalog {
	fn default() -> Self {
		Self {
			resources: vec![
				MockApiResource::cluster_scoped("v1", "namespaces", "Namespace"),
				MockApiResource::namespaced("v1", "services", "Service"),
				MockApiResource::namespaced("apps/v1", "deployments", "Deployment"),
				MockApiResource::namespaced("networking.k8s.io/v1", "ingresses", "Ingress"),
				MockApiResource::cluster_scoped(
					"networking.k8s.io/v1",
					"ingressclasses",
					"IngressClass",
				),
				MockApiResource::cluster_scoped("storage.k8s.io/v1", "storageclasses", "StorageClass"),
			],
		}
	}
}

impl MockCatalog {
	pub fn by_kind(&self, group_version: &str, kind: &str) -> Option<&MockApiResource> {
		self.resources
			.iter()
			.find(|r| r.group_version == group_version && r.kind == kind)
	}

	pub fn by_plural(&self, group_version: &str, plural: &str) -> Option<&MockApiResource> {
		self.resources
			.iter()
			.find(|r| r.group_version == group_version && r.plural == plural)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_collection_paths() {
		let catalog = MockCatalog::default();
		let deployments = catalog.by_kind("apps/v1", "Deployment").unwrap();
		assert_eq!(
			deployments.collection_path(Some("testyaml")),
			"/apis/apps/v1/namespaces/testyaml/deployments"
		);
		let namespaces = catalog.by_plural("v1", "namespaces").unwrap();
		assert_eq!(namespaces.collection_path(Some("ignored")), "/api/v1/namespaces");
		assert_eq!(
			catalog
				.by_kind("storage.k8s.io/v1", "StorageClass")
				.unwrap()
				.qualified_name(),
			"storageclasses.storage.k8s.io"
		);
	}
}
