//! The closed set of resource kinds this tool understands.
//!
//! [`Resource`] is a tagged union over the typed k8s-openapi objects. The kind
//! of a manifest is resolved through a single static table keyed by the
//! `kind` discriminator, so the caller never has to name the target type.

use std::{fmt, str::FromStr};

use k8s_openapi::api::{
	apps::v1::Deployment,
	core::v1::{Namespace, Service},
	networking::v1::{Ingress, IngressClass},
	storage::v1::StorageClass,
};
use kube::{Api, ResourceExt};
use phf::phf_map;
use serde::{de::DeserializeOwned, Serialize};

use crate::{
	error::{Error, Result},
	manifest,
};

/// Kubernetes API resource scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
	/// Resource is namespaced (e.g., Deployment, Service).
	Namespaced,

	/// Resource is cluster-wide (e.g., Namespace, StorageClass).
	ClusterWide,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
	Namespace,
	Deployment,
	Service,
	Ingress,
	IngressClass,
	StorageClass,
}

/// Dispatch table keyed by the manifest `kind` field.
static KINDS: phf::Map<&'static str, ResourceKind> = phf_map! {
	"Namespace" => ResourceKind::Namespace,
	"Deployment" => ResourceKind::Deployment,
	"Service" => ResourceKind::Service,
	"Ingress" => ResourceKind::Ingress,
	"IngressClass" => ResourceKind::IngressClass,
	"StorageClass" => ResourceKind::StorageClass,
};

/// Lowercase names accepted on the command line, kubectl style.
static ALIASES: phf::Map<&'static str, ResourceKind> = phf_map! {
	"namespace" => ResourceKind::Namespace,
	"namespaces" => ResourceKind::Namespace,
	"ns" => ResourceKind::Namespace,
	"deployment" => ResourceKind::Deployment,
	"deployments" => ResourceKind::Deployment,
	"deploy" => ResourceKind::Deployment,
	"service" => ResourceKind::Service,
	"services" => ResourceKind::Service,
	"svc" => ResourceKind::Service,
	"ingress" => ResourceKind::Ingress,
	"ingresses" => ResourceKind::Ingress,
	"ing" => ResourceKind::Ingress,
	"ingressclass" => ResourceKind::IngressClass,
	"ingressclasses" => ResourceKind::IngressClass,
	"storageclass" => ResourceKind::StorageClass,
	"storageclasses" => ResourceKind::StorageClass,
	"sc" => ResourceKind::StorageClass,
};

impl ResourceKind {
	pub const ALL: [ResourceKind; 6] = [
		ResourceKind::Namespace,
		ResourceKind::Deployment,
		ResourceKind::Service,
		ResourceKind::Ingress,
		ResourceKind::IngressClass,
		ResourceKind::StorageClass,
	];

	/// Look up a kind by the exact value of a manifest `kind` field.
	pub fn from_kind_field(kind: &str) -> Option<Self> {
		KINDS.get(kind).copied()
	}

	pub fn as_str(self) -> &'static str {
		match self {
			ResourceKind::Namespace => <Namespace as k8s_openapi::Resource>::KIND,
			ResourceKind::Deployment => <Deployment as k8s_openapi::Resource>::KIND,
			ResourceKind::Service => <Service as k8s_openapi::Resource>::KIND,
			ResourceKind::Ingress => <Ingress as k8s_openapi::Resource>::KIND,
			ResourceKind::IngressClass => <IngressClass as k8s_openapi::Resource>::KIND,
			ResourceKind::StorageClass => <StorageClass as k8s_openapi::Resource>::KIND,
		}
	}

	pub fn api_version(self) -> &'static str {
		match self {
			ResourceKind::Namespace => <Namespace as k8s_openapi::Resource>::API_VERSION,
			ResourceKind::Deployment => <Deployment as k8s_openapi::Resource>::API_VERSION,
			ResourceKind::Service => <Service as k8s_openapi::Resource>::API_VERSION,
			ResourceKind::Ingress => <Ingress as k8s_openapi::Resource>::API_VERSION,
			ResourceKind::IngressClass => <IngressClass as k8s_openapi::Resource>::API_VERSION,
			ResourceKind::StorageClass => <StorageClass as k8s_openapi::Resource>::API_VERSION,
		}
	}

	pub fn scope(self) -> ResourceScope {
		match self {
			ResourceKind::Deployment | ResourceKind::Service | ResourceKind::Ingress => {
				ResourceScope::Namespaced
			}
			ResourceKind::Namespace | ResourceKind::IngressClass | ResourceKind::StorageClass => {
				ResourceScope::ClusterWide
			}
		}
	}

	/// Decode canonical JSON bytes as this kind.
	pub fn decode(self, canonical: &[u8]) -> Result<Resource> {
		Ok(match self {
			ResourceKind::Namespace => Resource::Namespace(manifest::decode(canonical)?),
			ResourceKind::Deployment => Resource::Deployment(manifest::decode(canonical)?),
			ResourceKind::Service => Resource::Service(manifest::decode(canonical)?),
			ResourceKind::Ingress => Resource::Ingress(manifest::decode(canonical)?),
			ResourceKind::IngressClass => Resource::IngressClass(manifest::decode(canonical)?),
			ResourceKind::StorageClass => Resource::StorageClass(manifest::decode(canonical)?),
		})
	}
}

impl fmt::Display for ResourceKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for ResourceKind {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self> {
		if let Some(kind) = Self::from_kind_field(s) {
			return Ok(kind);
		}
		ALIASES
			.get(s.to_ascii_lowercase().as_str())
			.copied()
			.ok_or_else(|| Error::UnknownKind(s.to_string()))
	}
}

/// A decoded resource of one of the supported kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum Resource {
	Namespace(Namespace),
	Deployment(Deployment),
	Service(Service),
	Ingress(Ingress),
	IngressClass(IngressClass),
	StorageClass(StorageClass),
}

/// Apply `$body` to the typed object inside any [`Resource`]-shaped enum.
macro_rules! with_variant {
	($enum:ident, $value:expr, $inner:ident => $body:expr) => {
		match $value {
			$enum::Namespace($inner) => $body,
			$enum::Deployment($inner) => $body,
			$enum::Service($inner) => $body,
			$enum::Ingress($inner) => $body,
			$enum::IngressClass($inner) => $body,
			$enum::StorageClass($inner) => $body,
		}
	};
}
pub(crate) use with_variant;

impl Resource {
	pub fn kind(&self) -> ResourceKind {
		match self {
			Resource::Namespace(_) => ResourceKind::Namespace,
			Resource::Deployment(_) => ResourceKind::Deployment,
			Resource::Service(_) => ResourceKind::Service,
			Resource::Ingress(_) => ResourceKind::Ingress,
			Resource::IngressClass(_) => ResourceKind::IngressClass,
			Resource::StorageClass(_) => ResourceKind::StorageClass,
		}
	}

	/// `metadata.name`, empty when the manifest has none.
	pub fn name(&self) -> String {
		with_variant!(Resource, self, obj => obj.name_any())
	}

	pub fn namespace(&self) -> Option<String> {
		with_variant!(Resource, self, obj => obj.namespace())
	}

	pub fn uid(&self) -> Option<String> {
		with_variant!(Resource, self, obj => obj.uid())
	}

	pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
		with_variant!(Resource, self, obj => serde_json::to_value(obj))
	}
}

/// Point-in-time snapshot returned by a list call.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceList {
	Namespace(Vec<Namespace>),
	Deployment(Vec<Deployment>),
	Service(Vec<Service>),
	Ingress(Vec<Ingress>),
	IngressClass(Vec<IngressClass>),
	StorageClass(Vec<StorageClass>),
}

impl ResourceList {
	pub fn kind(&self) -> ResourceKind {
		match self {
			ResourceList::Namespace(_) => ResourceKind::Namespace,
			ResourceList::Deployment(_) => ResourceKind::Deployment,
			ResourceList::Service(_) => ResourceKind::Service,
			ResourceList::Ingress(_) => ResourceKind::Ingress,
			ResourceList::IngressClass(_) => ResourceKind::IngressClass,
			ResourceList::StorageClass(_) => ResourceKind::StorageClass,
		}
	}

	pub fn len(&self) -> usize {
		with_variant!(ResourceList, self, items => items.len())
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn names(&self) -> Vec<String> {
		with_variant!(ResourceList, self, items => items.iter().map(|i| i.name_any()).collect())
	}

	/// Items as JSON values, in server order.
	pub fn to_json(&self) -> serde_json::Result<Vec<serde_json::Value>> {
		with_variant!(ResourceList, self, items => items.iter().map(serde_json::to_value).collect())
	}

	/// `(namespace, name, age source)` rows for table output.
	pub fn rows(&self) -> Vec<ListRow> {
		with_variant!(ResourceList, self, items => items
			.iter()
			.map(|i| ListRow {
				namespace: i.namespace(),
				name: i.name_any(),
				created: i.creation_timestamp().map(|t| t.0.to_string()),
			})
			.collect())
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRow {
	pub namespace: Option<String>,
	pub name: String,
	pub created: Option<String>,
}

/// A typed k8s-openapi object this tool can create, list and delete.
pub trait ManagedKind:
	kube::Resource<DynamicType = ()>
	+ Clone
	+ fmt::Debug
	+ Serialize
	+ DeserializeOwned
	+ Send
	+ Sync
	+ 'static
{
	const KIND: ResourceKind;

	/// Typed API handle. `namespace` is ignored for cluster-wide kinds.
	fn api(client: kube::Client, namespace: &str) -> Api<Self>;

	fn into_resource(self) -> Resource;

	fn into_list(items: Vec<Self>) -> ResourceList;
}

macro_rules! managed_kind {
	($ty:ident, namespaced) => {
		managed_kind!(@impl $ty, |client, namespace| Api::namespaced(client, namespace));
	};
	($ty:ident, cluster) => {
		managed_kind!(@impl $ty, |client, _namespace| Api::all(client));
	};
	(@impl $ty:ident, |$client:ident, $namespace:ident| $api:expr) => {
		impl ManagedKind for $ty {
			const KIND: ResourceKind = ResourceKind::$ty;

			fn api($client: kube::Client, $namespace: &str) -> Api<Self> {
				$api
			}

			fn into_resource(self) -> Resource {
				Resource::$ty(self)
			}

			fn into_list(items: Vec<Self>) -> ResourceList {
				ResourceList::$ty(items)
			}
		}
	};
}

managed_kind!(Namespace, cluster);
managed_kind!(Deployment, namespaced);
managed_kind!(Service, namespaced);
managed_kind!(Ingress, namespaced);
managed_kind!(IngressClass, cluster);
managed_kind!(StorageClass, cluster);
