use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier for one registry-resident component instance.
///
/// Handles are issued by a component registry from a monotonically increasing counter and are
/// never reused for a different instance within that registry. The raw value `0` is never
/// issued, so hosts may use it as a null handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentHandle(u64);

impl ComponentHandle {
	/// The null handle. No registry issues it.
	pub const NULL: Self = Self(0);

	/// Wraps a raw handle value received from the host side.
	#[inline]
	pub const fn from_raw(raw: u64) -> Self {
		Self(raw)
	}

	/// Returns the raw value passed across the boundary.
	#[inline]
	pub const fn as_raw(self) -> u64 {
		self.0
	}

	/// Returns true for the null handle.
	#[inline]
	pub const fn is_null(self) -> bool {
		self.0 == 0
	}
}

impl fmt::Display for ComponentHandle {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

impl From<ComponentHandle> for u64 {
	fn from(handle: ComponentHandle) -> Self {
		handle.0
	}
}
