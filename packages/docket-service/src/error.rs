pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid argument: {message}")]
	InvalidArgument { message: String },
	#[error("Storage unavailable: {message}")]
	StorageUnavailable { message: String },
	#[error("Capability unavailable: {message}")]
	CapabilityUnavailable { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Rate limited: {message}")]
	RateLimited { message: String },
	#[error("Spool error: {message}")]
	Spool { message: String },
}
impl Error {
	pub(crate) fn invalid(message: impl Into<String>) -> Self {
		Self::InvalidArgument { message: message.into() }
	}
}
impl From<docket_storage::Error> for Error {
	fn from(err: docket_storage::Error) -> Self {
		match err {
			docket_storage::Error::Sqlx(inner) =>
				Self::StorageUnavailable { message: inner.to_string() },
			docket_storage::Error::Io(inner) => Self::Spool { message: inner.to_string() },
			docket_storage::Error::SerdeJson(inner) => Self::Spool { message: inner.to_string() },
			docket_storage::Error::InvalidArgument(message) => Self::InvalidArgument { message },
			docket_storage::Error::NotFound(message) => Self::NotFound { message },
			docket_storage::Error::Conflict(message) => Self::Conflict { message },
			err @ docket_storage::Error::DimensionMismatch { .. } =>
				Self::InvalidArgument { message: err.to_string() },
		}
	}
}
impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::CapabilityUnavailable { message: err.to_string() }
	}
}
