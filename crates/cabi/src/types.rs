//! `#[repr(C)]` types shared with the host.

use conduit_registry::{BridgeError, LinearMode};

/// Bumped on any layout or signature change.
pub const CONDUIT_C_ABI_VERSION: u32 = 1;

/// Outcome of every entry point.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConduitStatus {
	Ok = 0,
	NullPointer = 1,
	InvalidArgument = 2,
	HandleNotFound = 3,
	/// The capability resolved Absent for the handle's type.
	Unsupported = 4,
	/// The component's callback failed; see `conduit_last_error`.
	CallbackFailed = 5,
	/// A panic was caught at the boundary.
	Panicked = 6,
	/// ABI version mismatch.
	Incompatible = 7,
}

impl From<&BridgeError> for ConduitStatus {
	fn from(err: &BridgeError) -> Self {
		match err {
			BridgeError::HandleNotFound(_) => Self::HandleNotFound,
			BridgeError::Unsupported { .. } => Self::Unsupported,
			BridgeError::Callback { .. } | BridgeError::InvalidSetup { .. } => Self::CallbackFailed,
			BridgeError::MissingMandatoryCapability { .. }
			| BridgeError::ClaimedWithoutCallback { .. }
			| BridgeError::KindConflict { .. }
			| BridgeError::TypeMismatch { .. } => Self::InvalidArgument,
		}
	}
}

#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConduitBool(pub u8);

impl From<bool> for ConduitBool {
	fn from(value: bool) -> Self {
		Self(value as u8)
	}
}

/// Borrowed UTF-8 string.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ConduitStr {
	pub ptr: *const u8,
	pub len: usize,
}

impl ConduitStr {
	pub const EMPTY: Self = Self {
		ptr: std::ptr::null(),
		len: 0,
	};

	pub fn from_static(s: &'static str) -> Self {
		Self {
			ptr: s.as_ptr(),
			len: s.len(),
		}
	}
}

/// String allocated by this library; release with `conduit_str_free`.
#[repr(C)]
#[derive(Debug)]
pub struct ConduitOwnedStr {
	pub ptr: *mut u8,
	pub len: usize,
}

impl ConduitOwnedStr {
	pub(crate) fn from_string(s: String) -> Self {
		let bytes = s.into_bytes().into_boxed_slice();
		let len = bytes.len();
		let ptr = Box::into_raw(bytes) as *mut u8;
		Self { ptr, len }
	}
}

/// One named array, borrowed for the duration of a call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ConduitBuffer {
	pub name: ConduitStr,
	pub data: *mut f64,
	pub len: usize,
}

/// One partials block `d(of)/d(wrt)`, borrowed for the duration of a call.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ConduitPartialsBuffer {
	pub of: ConduitStr,
	pub wrt: ConduitStr,
	pub data: *mut f64,
	pub len: usize,
}

/// Array of [`ConduitBuffer`]s. A null `ptr` with `len == 0` is an empty list.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ConduitBufferList {
	pub ptr: *const ConduitBuffer,
	pub len: usize,
}

impl ConduitBufferList {
	pub const EMPTY: Self = Self {
		ptr: std::ptr::null(),
		len: 0,
	};
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct ConduitPartialsList {
	pub ptr: *const ConduitPartialsBuffer,
	pub len: usize,
}

impl ConduitPartialsList {
	pub const EMPTY: Self = Self {
		ptr: std::ptr::null(),
		len: 0,
	};
}

/// Direction of `conduit_apply_linear`; crosses the boundary as a `u32`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConduitLinearMode {
	Fwd = 0,
	Rev = 1,
}

impl ConduitLinearMode {
	pub fn from_raw(raw: u32) -> Option<Self> {
		match raw {
			0 => Some(Self::Fwd),
			1 => Some(Self::Rev),
			_ => None,
		}
	}
}

impl From<ConduitLinearMode> for LinearMode {
	fn from(mode: ConduitLinearMode) -> Self {
		match mode {
			ConduitLinearMode::Fwd => LinearMode::Fwd,
			ConduitLinearMode::Rev => LinearMode::Rev,
		}
	}
}
