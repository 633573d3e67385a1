//! Boundary failures, per-thread last-error text, and panic containment.

use std::cell::RefCell;
use std::panic::{AssertUnwindSafe, catch_unwind};

use conduit_registry::BridgeError;
use tracing::error;

use crate::types::{ConduitStatus, ConduitStr};

/// A failure that stops an entry point before or during dispatch.
#[derive(Debug, thiserror::Error)]
pub(crate) enum FfiError {
	#[error("null pointer passed for '{0}'")]
	Null(&'static str),
	#[error("invalid argument: {0}")]
	InvalidArgument(String),
	#[error("ABI version {actual} requested, this library implements {expected}")]
	Incompatible { expected: u32, actual: u32 },
	#[error(transparent)]
	Bridge(#[from] BridgeError),
}

impl FfiError {
	fn status(&self) -> ConduitStatus {
		match self {
			Self::Null(_) => ConduitStatus::NullPointer,
			Self::InvalidArgument(_) => ConduitStatus::InvalidArgument,
			Self::Incompatible { .. } => ConduitStatus::Incompatible,
			Self::Bridge(err) => err.into(),
		}
	}
}

thread_local! {
	static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

fn set_last_error(message: String) {
	LAST_ERROR.with(|slot| *slot.borrow_mut() = message);
}

/// Text of the last failure on this thread. Valid until the next entry point call on the
/// same thread.
pub(crate) fn last_error() -> ConduitStr {
	LAST_ERROR.with(|slot| {
		let message = slot.borrow();
		if message.is_empty() {
			ConduitStr::EMPTY
		} else {
			ConduitStr {
				ptr: message.as_ptr(),
				len: message.len(),
			}
		}
	})
}

/// Runs one entry point body, converting its outcome to a status.
///
/// Clears the last error on entry. Panics never unwind into the host.
pub(crate) fn guard(entry: &'static str, body: impl FnOnce() -> Result<(), FfiError>) -> ConduitStatus {
	set_last_error(String::new());
	match catch_unwind(AssertUnwindSafe(body)) {
		Ok(Ok(())) => ConduitStatus::Ok,
		Ok(Err(err)) => {
			let status = err.status();
			let message = err.to_string();
			set_last_error(message);
			status
		}
		Err(payload) => {
			let message = panic_message(payload.as_ref());
			error!(domain = "cabi", entry, %message, "panic contained at boundary");
			set_last_error(format!("panic in {entry}: {message}"));
			ConduitStatus::Panicked
		}
	}
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		(*s).to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"<non-string panic payload>".to_string()
	}
}
