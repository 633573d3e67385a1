//! C ABI for driving registry-resident components from a foreign host.
//!
//! Components are created on the Rust side through [`ConduitBridge::bridge`]; the host only
//! sees the bridge pointer and `u64` handles. Every entry point returns a [`ConduitStatus`];
//! on failure `conduit_last_error` describes what went wrong on the calling thread.
//!
//! # Buffer aliasing
//!
//! Arrays passed in a [`ConduitBufferList`] or [`ConduitPartialsList`] are borrowed for the
//! duration of one call. The host must keep them alive and untouched until the call returns,
//! and must not pass overlapping arrays in writable roles.

mod error;
mod types;
mod view;

use conduit_registry::{Bridge, BridgeConfig, Capability, ComponentHandle, LinearMode};

pub use crate::types::{
	CONDUIT_C_ABI_VERSION, ConduitBool, ConduitBuffer, ConduitBufferList, ConduitLinearMode, ConduitOwnedStr,
	ConduitPartialsBuffer, ConduitPartialsList, ConduitStatus, ConduitStr,
};
use crate::error::{FfiError, guard};
use crate::view::{partials_views, read_views, write_views};

/// Opaque bridge handed to the host.
pub struct ConduitBridge {
	bridge: Bridge,
}

impl ConduitBridge {
	pub fn new(bridge: Bridge) -> Self {
		Self { bridge }
	}

	pub fn bridge(&self) -> &Bridge {
		&self.bridge
	}

	/// Transfers ownership to the host; release with [`conduit_bridge_free`].
	pub fn into_raw(self: Box<Self>) -> *mut ConduitBridge {
		Box::into_raw(self)
	}
}

/// # Safety
///
/// `ptr` must be null or a live pointer from this library.
unsafe fn bridge_arg<'a>(ptr: *const ConduitBridge) -> Result<&'a Bridge, FfiError> {
	unsafe { ptr.as_ref() }
		.map(ConduitBridge::bridge)
		.ok_or(FfiError::Null("bridge"))
}

fn handle_arg(raw: u64) -> ComponentHandle {
	ComponentHandle::from_raw(raw)
}

/// Creates a bridge with the default configuration.
///
/// # Safety
///
/// `out` must be null or valid for one pointer write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_bridge_new(abi_version: u32, out: *mut *mut ConduitBridge) -> ConduitStatus {
	guard("conduit_bridge_new", || {
		if out.is_null() {
			return Err(FfiError::Null("out"));
		}
		if abi_version != CONDUIT_C_ABI_VERSION {
			return Err(FfiError::Incompatible {
				expected: CONDUIT_C_ABI_VERSION,
				actual: abi_version,
			});
		}
		let bridge = Box::new(ConduitBridge::new(Bridge::new(BridgeConfig::default())));
		unsafe { out.write(bridge.into_raw()) };
		Ok(())
	})
}

/// Releases a bridge and every component it still holds.
///
/// # Safety
///
/// `bridge` must be null or a pointer from [`conduit_bridge_new`] or
/// [`ConduitBridge::into_raw`] not yet freed. No call on it may be in flight.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_bridge_free(bridge: *mut ConduitBridge) {
	if !bridge.is_null() {
		drop(unsafe { Box::from_raw(bridge) });
	}
}

/// Releases a component. Removing an unknown handle succeeds.
///
/// # Safety
///
/// `bridge` must be a live pointer from this library.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_remove(bridge: *const ConduitBridge, handle: u64) -> ConduitStatus {
	guard("conduit_remove", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		bridge.remove(handle_arg(handle));
		Ok(())
	})
}

/// # Safety
///
/// `bridge` must be a live pointer from this library; `out` valid for one write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_size(bridge: *const ConduitBridge, out: *mut usize) -> ConduitStatus {
	guard("conduit_size", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		if out.is_null() {
			return Err(FfiError::Null("out"));
		}
		unsafe { out.write(bridge.size()) };
		Ok(())
	})
}

/// Reports whether `capability` (its index in the protocol order, `0` for setup) is Present
/// for the handle's type.
///
/// # Safety
///
/// `bridge` must be a live pointer from this library; `out` valid for one write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_has_capability(
	bridge: *const ConduitBridge,
	handle: u64,
	capability: u32,
	out: *mut ConduitBool,
) -> ConduitStatus {
	guard("conduit_has_capability", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		if out.is_null() {
			return Err(FfiError::Null("out"));
		}
		let capability = Capability::from_index(capability)
			.ok_or_else(|| FfiError::InvalidArgument(format!("unknown capability index {capability}")))?;
		let present = bridge.capabilities(handle_arg(handle))?.has(capability);
		unsafe { out.write(present.into()) };
		Ok(())
	})
}

/// Writes the component's setup descriptors as JSON. Release with [`conduit_str_free`].
///
/// # Safety
///
/// `bridge` must be a live pointer from this library; `out` valid for one write.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_setup_json(
	bridge: *const ConduitBridge,
	handle: u64,
	out: *mut ConduitOwnedStr,
) -> ConduitStatus {
	guard("conduit_setup_json", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		if out.is_null() {
			return Err(FfiError::Null("out"));
		}
		let setup = bridge.setup(handle_arg(handle))?;
		let json = serde_json::to_string(&*setup).map_err(|err| FfiError::InvalidArgument(err.to_string()))?;
		unsafe { out.write(ConduitOwnedStr::from_string(json)) };
		Ok(())
	})
}

/// # Safety
///
/// `s` must come from this library and not have been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_str_free(s: ConduitOwnedStr) {
	if !s.ptr.is_null() {
		drop(unsafe { Box::from_raw(std::ptr::slice_from_raw_parts_mut(s.ptr, s.len)) });
	}
}

/// Text of the last failure on the calling thread, or an empty string. Valid until the next
/// call into this library on the same thread.
#[unsafe(no_mangle)]
pub extern "C" fn conduit_last_error() -> ConduitStr {
	error::last_error()
}

/// # Safety
///
/// `bridge` must be a live pointer from this library. Buffer lists must follow the aliasing
/// rules in the crate docs.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_compute(
	bridge: *const ConduitBridge,
	handle: u64,
	inputs: ConduitBufferList,
	outputs: ConduitBufferList,
) -> ConduitStatus {
	guard("conduit_compute", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		let inputs = unsafe { read_views(inputs, "inputs")? };
		let mut outputs = unsafe { write_views(outputs, "outputs")? };
		bridge.compute(handle_arg(handle), &inputs, &mut outputs)?;
		Ok(())
	})
}

/// # Safety
///
/// As [`conduit_compute`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_compute_partials(
	bridge: *const ConduitBridge,
	handle: u64,
	inputs: ConduitBufferList,
	partials: ConduitPartialsList,
) -> ConduitStatus {
	guard("conduit_compute_partials", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		let inputs = unsafe { read_views(inputs, "inputs")? };
		let mut partials = unsafe { partials_views(partials, "partials")? };
		bridge.compute_partials(handle_arg(handle), &inputs, &mut partials)?;
		Ok(())
	})
}

/// # Safety
///
/// As [`conduit_compute`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_apply_nonlinear(
	bridge: *const ConduitBridge,
	handle: u64,
	inputs: ConduitBufferList,
	outputs: ConduitBufferList,
	residuals: ConduitBufferList,
) -> ConduitStatus {
	guard("conduit_apply_nonlinear", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		let inputs = unsafe { read_views(inputs, "inputs")? };
		let outputs = unsafe { read_views(outputs, "outputs")? };
		let mut residuals = unsafe { write_views(residuals, "residuals")? };
		bridge.apply_nonlinear(handle_arg(handle), &inputs, &outputs, &mut residuals)?;
		Ok(())
	})
}

/// # Safety
///
/// As [`conduit_compute`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_linearize(
	bridge: *const ConduitBridge,
	handle: u64,
	inputs: ConduitBufferList,
	outputs: ConduitBufferList,
	partials: ConduitPartialsList,
) -> ConduitStatus {
	guard("conduit_linearize", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		let inputs = unsafe { read_views(inputs, "inputs")? };
		let outputs = unsafe { read_views(outputs, "outputs")? };
		let mut partials = unsafe { partials_views(partials, "partials")? };
		bridge.linearize(handle_arg(handle), &inputs, &outputs, &mut partials)?;
		Ok(())
	})
}

/// # Safety
///
/// As [`conduit_compute`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_guess_nonlinear(
	bridge: *const ConduitBridge,
	handle: u64,
	inputs: ConduitBufferList,
	outputs: ConduitBufferList,
	residuals: ConduitBufferList,
) -> ConduitStatus {
	guard("conduit_guess_nonlinear", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		let inputs = unsafe { read_views(inputs, "inputs")? };
		let mut outputs = unsafe { write_views(outputs, "outputs")? };
		let residuals = unsafe { read_views(residuals, "residuals")? };
		bridge.guess_nonlinear(handle_arg(handle), &inputs, &mut outputs, &residuals)?;
		Ok(())
	})
}

/// # Safety
///
/// As [`conduit_compute`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn conduit_solve_nonlinear(
	bridge: *const ConduitBridge,
	handle: u64,
	inputs: ConduitBufferList,
	outputs: ConduitBufferList,
) -> ConduitStatus {
	guard("conduit_solve_nonlinear", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		let inputs = unsafe { read_views(inputs, "inputs")? };
		let mut outputs = unsafe { write_views(outputs, "outputs")? };
		bridge.solve_nonlinear(handle_arg(handle), &inputs, &mut outputs)?;
		Ok(())
	})
}

/// `mode` is a [`ConduitLinearMode`] value.
///
/// # Safety
///
/// As [`conduit_compute`].
#[unsafe(no_mangle)]
#[allow(clippy::too_many_arguments)]
pub unsafe extern "C" fn conduit_apply_linear(
	bridge: *const ConduitBridge,
	handle: u64,
	inputs: ConduitBufferList,
	outputs: ConduitBufferList,
	d_inputs: ConduitBufferList,
	d_outputs: ConduitBufferList,
	d_residuals: ConduitBufferList,
	mode: u32,
) -> ConduitStatus {
	guard("conduit_apply_linear", || {
		let bridge = unsafe { bridge_arg(bridge)? };
		let mode: LinearMode = ConduitLinearMode::from_raw(mode)
			.ok_or_else(|| FfiError::InvalidArgument(format!("unknown linear mode {mode}")))?
			.into();
		let inputs = unsafe { read_views(inputs, "inputs")? };
		let outputs = unsafe { read_views(outputs, "outputs")? };
		let mut d_inputs = unsafe { write_views(d_inputs, "d_inputs")? };
		let mut d_outputs = unsafe { write_views(d_outputs, "d_outputs")? };
		let mut d_residuals = unsafe { write_views(d_residuals, "d_residuals")? };
		bridge.apply_linear(
			handle_arg(handle),
			&inputs,
			&outputs,
			&mut d_inputs,
			&mut d_outputs,
			&mut d_residuals,
			mode,
		)?;
		Ok(())
	})
}

#[cfg(test)]
mod tests;
