//! Remote create/list/delete operations for the supported kinds.
//!
//! The generic functions work for any [`ManagedKind`]; the methods on
//! [`Resource`] and [`ResourceKind`] dispatch a runtime kind to them.
//! Every call is a fresh round trip bounded by the client's timeout.

use std::future::Future;

use k8s_openapi::api::{
	apps::v1::Deployment,
	core::v1::{Namespace, Service},
	networking::v1::{Ingress, IngressClass},
	storage::v1::StorageClass,
};
use kube::{
	api::{DeleteParams, ListParams, PostParams},
	ResourceExt,
};
use tracing::{debug, error, info, instrument};

use crate::{
	client::ClusterClient,
	error::{Error, Operation, Result},
	resource::{with_variant, ManagedKind, Resource, ResourceKind, ResourceList, ResourceScope},
};

/// Run one API call under the client's deadline, mapping failures.
async fn call<T>(
	client: &ClusterClient,
	op: Operation,
	kind: ResourceKind,
	name: &str,
	request: impl Future<Output = Result<T, kube::Error>>,
) -> Result<T> {
	match tokio::time::timeout(client.timeout(), request).await {
		Ok(Ok(value)) => Ok(value),
		Ok(Err(source)) => {
			error!(%op, %kind, name, error = %source, "API request failed");
			Err(Error::Api {
				op,
				kind,
				name: name.to_string(),
				source: Box::new(source),
			})
		}
		Err(_) => {
			error!(%op, %kind, name, timeout = ?client.timeout(), "API request timed out");
			Err(Error::TimedOut {
				op,
				kind,
				name: name.to_string(),
				timeout: client.timeout(),
			})
		}
	}
}

/// Create one object and return the server's representation of it.
///
/// Namespaced objects are placed according to the client's namespace policy;
/// cluster-wide objects have any namespace stripped.
#[instrument(skip_all, fields(kind = %K::KIND, name = %resource.name_any()))]
pub async fn create<K: ManagedKind>(client: &ClusterClient, mut resource: K) -> Result<K> {
	let name = resource.name_any();
	let namespace = match K::KIND.scope() {
		ResourceScope::Namespaced => {
			let namespace = client.namespace_for(resource.meta().namespace.as_deref());
			resource.meta_mut().namespace = Some(namespace.clone());
			namespace
		}
		ResourceScope::ClusterWide => {
			resource.meta_mut().namespace = None;
			String::new()
		}
	};

	let api = K::api(client.client().clone(), &namespace);
	let params = PostParams {
		dry_run: client.dry_run(),
		..Default::default()
	};

	let created = call(
		client,
		Operation::Create,
		K::KIND,
		&name,
		api.create(&params, &resource),
	)
	.await?;

	info!(
		namespace = created.namespace().as_deref().unwrap_or(""),
		uid = created.uid().as_deref().unwrap_or(""),
		dry_run = client.dry_run(),
		"created"
	);
	Ok(created)
}

/// List every object of a kind in the client's scope, following pagination.
#[instrument(skip_all, fields(kind = %K::KIND, namespace = client.namespace()))]
pub async fn list<K: ManagedKind>(client: &ClusterClient) -> Result<Vec<K>> {
	let api = K::api(client.client().clone(), client.namespace());
	let mut items = Vec::new();
	let mut continue_token: Option<String> = None;
	let mut pages = 0usize;

	loop {
		let mut params = ListParams::default().limit(client.page_size());
		if let Some(token) = &continue_token {
			params = params.continue_token(token);
		}

		let page = call(client, Operation::List, K::KIND, "*", api.list(&params)).await?;
		pages += 1;
		items.extend(page.items);

		continue_token =
			next_continue_token(K::KIND, continue_token.as_deref(), page.metadata.continue_)?;
		if continue_token.is_none() {
			break;
		}
	}

	debug!(count = items.len(), pages, "listed");
	Ok(items)
}

/// Token for the next page, `None` once the listing is complete.
///
/// A server that hands back the token it was just given would loop forever.
fn next_continue_token(
	kind: ResourceKind,
	previous: Option<&str>,
	returned: Option<String>,
) -> Result<Option<String>> {
	match returned {
		Some(token) if token.is_empty() => Ok(None),
		Some(token) if previous == Some(token.as_str()) => {
			error!(%kind, token, "server repeated continue token");
			Err(Error::Pagination { kind, token })
		}
		other => Ok(other),
	}
}

/// Delete one object by name.
#[instrument(skip_all, fields(kind = %K::KIND, name = name))]
pub async fn delete<K: ManagedKind>(client: &ClusterClient, name: &str) -> Result<()> {
	if name.is_empty() {
		return Err(Error::MissingName(K::KIND));
	}

	let api = K::api(client.client().clone(), client.namespace());
	let params = DeleteParams {
		dry_run: client.dry_run(),
		..Default::default()
	};

	call(
		client,
		Operation::Delete,
		K::KIND,
		name,
		api.delete(name, &params),
	)
	.await?;

	info!(dry_run = client.dry_run(), "deleted");
	Ok(())
}

impl Resource {
	/// Submit this resource to the cluster.
	pub async fn create(self, client: &ClusterClient) -> Result<Resource> {
		with_variant!(Resource, self, obj => create(client, obj).await.map(ManagedKind::into_resource))
	}
}

impl ResourceKind {
	pub async fn list(self, client: &ClusterClient) -> Result<ResourceList> {
		let items = match self {
			ResourceKind::Namespace => list::<Namespace>(client).await.map(ManagedKind::into_list),
			ResourceKind::Deployment => list::<Deployment>(client).await.map(ManagedKind::into_list),
			ResourceKind::Service => list::<Service>(client).await.map(ManagedKind::into_list),
			ResourceKind::Ingress => list::<Ingress>(client).await.map(ManagedKind::into_list),
			ResourceKind::IngressClass => {
				list::<IngressClass>(client).await.map(ManagedKind::into_list)
			}
			ResourceKind::StorageClass => {
				list::<StorageClass>(client).await.map(ManagedKind::into_list)
			}
		}?;
		Ok(items)
	}

	pub async fn delete(self, client: &ClusterClient, name: &str) -> Result<()> {
		match self {
			ResourceKind::Namespace => delete::<Namespace>(client, name).await,
			ResourceKind::Deployment => delete::<Deployment>(client, name).await,
			ResourceKind::Service => delete::<Service>(client, name).await,
			ResourceKind::Ingress => delete::<Ingress>(client, name).await,
			ResourceKind::IngressClass => delete::<IngressClass>(client, name).await,
			ResourceKind::StorageClass => delete::<StorageClass>(client, name).await,
		}
	}
}
