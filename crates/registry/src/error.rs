//! Error taxonomy of the boundary layer.
//!
//! An Absent capability is not an error: resolution reports it as an ordinary outcome, and
//! [`BridgeError::Unsupported`] only appears when a caller asks to *invoke* one directly.

use conduit_primitives::{ComponentHandle, SetupError};

use crate::capability::Capability;

/// Failure raised by a component's own callback code.
///
/// Boxed so any error type can cross the adapter unchanged. Recover the concrete value with
/// [`BridgeError::callback_source`] and `downcast_ref`.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a component callback.
pub type CallbackResult<T = ()> = std::result::Result<T, CallbackError>;

/// Errors surfaced by the registry, resolver, and adapters.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
	/// The handle is not present in the registry: never issued, or already removed.
	#[error("component handle {0} not found")]
	HandleNotFound(ComponentHandle),

	/// The type did not claim and register `setup`.
	#[error("component type '{type_name}' does not provide the mandatory setup callback")]
	MissingMandatoryCapability { type_name: &'static str },

	/// The type claims a capability but registered no callback for it, and the configured
	/// policy rejects that instead of treating the capability as absent.
	#[error("component type '{type_name}' claims {capability} but registers no callback for it")]
	ClaimedWithoutCallback {
		type_name: &'static str,
		capability: Capability,
	},

	/// Present callbacks mix the explicit and implicit families.
	#[error("component type '{type_name}' mixes explicit and implicit callbacks: {present:?}")]
	KindConflict {
		type_name: &'static str,
		present: Vec<Capability>,
	},

	/// An adapter built for one component type was called with a handle of another type.
	#[error("{capability} adapter for '{expected}' called with {handle} of type '{actual}'")]
	TypeMismatch {
		handle: ComponentHandle,
		capability: Capability,
		expected: &'static str,
		actual: &'static str,
	},

	/// Direct invocation of a capability resolved Absent for the handle's type.
	#[error("{capability} is not supported by component type '{type_name}'")]
	Unsupported {
		type_name: &'static str,
		capability: Capability,
	},

	/// The descriptors returned by `setup` are inconsistent.
	#[error("component type '{type_name}' returned an invalid setup: {source}")]
	InvalidSetup {
		type_name: &'static str,
		#[source]
		source: SetupError,
	},

	/// A present callback failed. The component's error is kept as the source.
	#[error("{capability} failed for {handle}: {source}")]
	Callback {
		handle: ComponentHandle,
		capability: Capability,
		#[source]
		source: CallbackError,
	},
}

impl BridgeError {
	/// The component's own error when this is a callback failure.
	pub fn callback_source(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
		match self {
			Self::Callback { source, .. } => Some(source.as_ref()),
			_ => None,
		}
	}

	/// Returns true for [`BridgeError::HandleNotFound`].
	pub fn is_handle_not_found(&self) -> bool {
		matches!(self, Self::HandleNotFound(_))
	}
}

/// Result type for boundary operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
