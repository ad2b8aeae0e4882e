//! Error taxonomy for the manifest pipeline and cluster operations.
//!
//! Every stage returns [`Error`]. The underlying cause (I/O, YAML, serde, kube)
//! is kept as the error source so diagnostics keep the full chain, while
//! [`Error::kind`] gives callers a stable classification to branch on.

use std::{fmt, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::{client::ConnectionError, manifest::FormatError, resource::ResourceKind};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Remote operation that produced an API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Create,
	List,
	Delete,
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Operation::Create => write!(f, "creating"),
			Operation::List => write!(f, "listing"),
			Operation::Delete => write!(f, "deleting"),
		}
	}
}

#[derive(Debug, Error)]
pub enum Error {
	#[error("reading manifest {}", path.display())]
	Io {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	#[error("normalizing manifest")]
	Format(#[source] FormatError),

	#[error("decoding manifest as {kind}")]
	Decode {
		kind: ResourceKind,
		#[source]
		source: serde_json::Error,
	},

	#[error("canonical document is not valid JSON")]
	Canonical(#[source] serde_json::Error),

	#[error("manifest has no kind field")]
	MissingKind,

	#[error("unsupported resource kind `{0}`")]
	UnknownKind(String),

	#[error("{0} name must not be empty")]
	MissingName(ResourceKind),

	#[error("connecting to cluster")]
	Connection(#[from] ConnectionError),

	#[error("{op} {kind} {name}")]
	Api {
		op: Operation,
		kind: ResourceKind,
		/// Object name, or `*` for list requests.
		name: String,
		#[source]
		source: Box<kube::Error>,
	},

	#[error("listing {kind}: server repeated continue token `{token}`")]
	Pagination { kind: ResourceKind, token: String },

	#[error("{op} {kind} {name}: no response within {}s", timeout.as_secs())]
	TimedOut {
		op: Operation,
		kind: ResourceKind,
		name: String,
		timeout: Duration,
	},
}

/// Coarse error class, independent of the underlying library error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
	Io,
	Format,
	Decode,
	Connection,
	Api(ApiErrorKind),
}

/// Classification of a rejected remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
	NotFound,
	/// The object already exists, or a write raced another one.
	Conflict,
	Invalid,
	Unauthorized,
	Forbidden,
	Timeout,
	/// A continue token or resource version is too old to be served.
	Expired,
	/// The request never produced an API status (connection, TLS, body decoding).
	Transport,
	Other,
}

impl ApiErrorKind {
	/// Map an HTTP status code from an API `Status` response.
	pub fn from_status_code(code: u16) -> Self {
		match code {
			404 => ApiErrorKind::NotFound,
			410 => ApiErrorKind::Expired,
			409 => ApiErrorKind::Conflict,
			400 | 422 => ApiErrorKind::Invalid,
			401 => ApiErrorKind::Unauthorized,
			403 => ApiErrorKind::Forbidden,
			408 | 504 => ApiErrorKind::Timeout,
			_ => ApiErrorKind::Other,
		}
	}

	fn from_kube(err: &kube::Error) -> Self {
		match err {
			kube::Error::Api(status) => Self::from_status_code(status.code),
			_ => ApiErrorKind::Transport,
		}
	}
}

impl Error {
	pub fn kind(&self) -> ErrorKind {
		match self {
			Error::Io { .. } => ErrorKind::Io,
			Error::Format(_) => ErrorKind::Format,
			Error::Decode { .. }
			| Error::Canonical(_)
			| Error::MissingKind
			| Error::UnknownKind(_)
			| Error::MissingName(_) => ErrorKind::Decode,
			Error::Connection(_) => ErrorKind::Connection,
			Error::Api { source, .. } => ErrorKind::Api(ApiErrorKind::from_kube(source)),
			Error::Pagination { .. } => ErrorKind::Api(ApiErrorKind::Other),
			Error::TimedOut { .. } => ErrorKind::Api(ApiErrorKind::Timeout),
		}
	}

	/// Classification of an API failure, `None` for local errors.
	pub fn api_kind(&self) -> Option<ApiErrorKind> {
		match self.kind() {
			ErrorKind::Api(kind) => Some(kind),
			_ => None,
		}
	}

	pub fn is_not_found(&self) -> bool {
		self.api_kind() == Some(ApiErrorKind::NotFound)
	}

	pub fn is_conflict(&self) -> bool {
		self.api_kind() == Some(ApiErrorKind::Conflict)
	}
}
