use std::ptr;

use conduit_registry::{
	Buffers, BuffersMut, CallbackResult, ComponentSetup, Compute, ComputePartials, PartialsDescriptor, PartialsMut,
	Setup, VariableDescriptor, component_type,
};
use pretty_assertions::assert_eq;

use super::*;

struct Doubler;

impl Setup for Doubler {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default()
			.with_input(VariableDescriptor::new("x").with_shape([2]))
			.with_output(VariableDescriptor::new("y").with_shape([2]))
			.with_partials(PartialsDescriptor::new("y", "x").with_sparsity([0, 1], [0, 1])))
	}
}

impl Compute for Doubler {
	fn compute(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult {
		let x = inputs.require("x")?;
		for (y, x) in outputs.require_mut("y")?.iter_mut().zip(x) {
			*y = 2.0 * x;
		}
		Ok(())
	}
}

impl ComputePartials for Doubler {
	fn compute_partials(&mut self, _inputs: &Buffers<'_>, partials: &mut PartialsMut<'_>) -> CallbackResult {
		partials.require_mut("y", "x")?.fill(2.0);
		Ok(())
	}
}

component_type!(Doubler => [setup, compute, compute_partials]);

struct Panicky;

impl Setup for Panicky {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default())
	}
}

impl Compute for Panicky {
	fn compute(&mut self, _inputs: &Buffers<'_>, _outputs: &mut BuffersMut<'_>) -> CallbackResult {
		panic!("component bug");
	}
}

component_type!(Panicky => [setup, compute]);

struct Host {
	raw: *mut ConduitBridge,
}

impl Host {
	fn new() -> Self {
		let mut raw = ptr::null_mut();
		let status = unsafe { conduit_bridge_new(CONDUIT_C_ABI_VERSION, &mut raw) };
		assert_eq!(status, ConduitStatus::Ok);
		assert!(!raw.is_null());
		Self { raw }
	}

	fn bridge(&self) -> &Bridge {
		unsafe { &*self.raw }.bridge()
	}
}

impl Drop for Host {
	fn drop(&mut self) {
		unsafe { conduit_bridge_free(self.raw) };
	}
}

fn buffer(name: &'static str, data: &mut [f64]) -> ConduitBuffer {
	ConduitBuffer {
		name: ConduitStr::from_static(name),
		data: data.as_mut_ptr(),
		len: data.len(),
	}
}

fn list(buffers: &[ConduitBuffer]) -> ConduitBufferList {
	ConduitBufferList {
		ptr: buffers.as_ptr(),
		len: buffers.len(),
	}
}

fn last_error() -> String {
	let s = conduit_last_error();
	if s.ptr.is_null() {
		return String::new();
	}
	let bytes = unsafe { std::slice::from_raw_parts(s.ptr, s.len) };
	String::from_utf8_lossy(bytes).into_owned()
}

#[test]
fn version_mismatch_is_incompatible() {
	let mut raw = ptr::null_mut();
	let status = unsafe { conduit_bridge_new(CONDUIT_C_ABI_VERSION + 1, &mut raw) };
	assert_eq!(status, ConduitStatus::Incompatible);
	assert!(raw.is_null());
	assert!(last_error().contains("ABI version"));
}

#[test]
fn null_arguments_are_reported() {
	assert_eq!(
		unsafe { conduit_bridge_new(CONDUIT_C_ABI_VERSION, ptr::null_mut()) },
		ConduitStatus::NullPointer
	);
	let mut size = 0;
	assert_eq!(unsafe { conduit_size(ptr::null(), &mut size) }, ConduitStatus::NullPointer);
	assert_eq!(last_error(), "null pointer passed for 'bridge'");
}

#[test]
fn compute_through_the_boundary() {
	let host = Host::new();
	let handle = host.bridge().create(Doubler).unwrap().as_raw();

	let mut x = [1.5, -2.0];
	let mut y = [0.0, 0.0];
	let inputs = [buffer("x", &mut x)];
	let outputs = [buffer("y", &mut y)];
	let status = unsafe { conduit_compute(host.raw, handle, list(&inputs), list(&outputs)) };

	assert_eq!(status, ConduitStatus::Ok);
	assert_eq!(y, [3.0, -4.0]);
	assert_eq!(last_error(), "");
}

#[test]
fn partials_through_the_boundary() {
	let host = Host::new();
	let handle = host.bridge().create(Doubler).unwrap().as_raw();

	let mut x = [1.0, 1.0];
	let mut block = [0.0, 0.0];
	let inputs = [buffer("x", &mut x)];
	let partials = [ConduitPartialsBuffer {
		of: ConduitStr::from_static("y"),
		wrt: ConduitStr::from_static("x"),
		data: block.as_mut_ptr(),
		len: block.len(),
	}];
	let status = unsafe {
		conduit_compute_partials(
			host.raw,
			handle,
			list(&inputs),
			ConduitPartialsList {
				ptr: partials.as_ptr(),
				len: partials.len(),
			},
		)
	};

	assert_eq!(status, ConduitStatus::Ok);
	assert_eq!(block, [2.0, 2.0]);
}

#[test]
fn capabilities_and_unsupported_calls() {
	let host = Host::new();
	let handle = host.bridge().create(Doubler).unwrap().as_raw();

	let mut present = ConduitBool::default();
	let status = unsafe {
		conduit_has_capability(host.raw, handle, Capability::ComputePartials.index(), &mut present)
	};
	assert_eq!(status, ConduitStatus::Ok);
	assert_eq!(present, ConduitBool(1));

	let status =
		unsafe { conduit_has_capability(host.raw, handle, Capability::Linearize.index(), &mut present) };
	assert_eq!(status, ConduitStatus::Ok);
	assert_eq!(present, ConduitBool(0));

	let status = unsafe { conduit_has_capability(host.raw, handle, 99, &mut present) };
	assert_eq!(status, ConduitStatus::InvalidArgument);

	let status = unsafe {
		conduit_solve_nonlinear(host.raw, handle, ConduitBufferList::EMPTY, ConduitBufferList::EMPTY)
	};
	assert_eq!(status, ConduitStatus::Unsupported);
	assert!(last_error().contains("solve_nonlinear"));
}

#[test]
fn unknown_handle_and_idempotent_remove() {
	let host = Host::new();
	let handle = host.bridge().create(Doubler).unwrap().as_raw();

	let status = unsafe { conduit_compute(host.raw, 777, ConduitBufferList::EMPTY, ConduitBufferList::EMPTY) };
	assert_eq!(status, ConduitStatus::HandleNotFound);

	assert_eq!(unsafe { conduit_remove(host.raw, handle) }, ConduitStatus::Ok);
	assert_eq!(unsafe { conduit_remove(host.raw, handle) }, ConduitStatus::Ok);

	let mut size = usize::MAX;
	assert_eq!(unsafe { conduit_size(host.raw, &mut size) }, ConduitStatus::Ok);
	assert_eq!(size, 0);
}

#[test]
fn missing_buffer_is_a_callback_failure() {
	let host = Host::new();
	let handle = host.bridge().create(Doubler).unwrap().as_raw();

	let mut y = [0.0, 0.0];
	let outputs = [buffer("y", &mut y)];
	let status = unsafe { conduit_compute(host.raw, handle, ConduitBufferList::EMPTY, list(&outputs)) };

	assert_eq!(status, ConduitStatus::CallbackFailed);
	assert!(last_error().contains("missing buffer 'x'"));
}

#[test]
fn panics_are_contained() {
	let host = Host::new();
	let handle = host.bridge().create(Panicky).unwrap().as_raw();

	let status = unsafe { conduit_compute(host.raw, handle, ConduitBufferList::EMPTY, ConduitBufferList::EMPTY) };
	assert_eq!(status, ConduitStatus::Panicked);
	assert!(last_error().contains("component bug"));

	// The registry is still usable afterwards.
	let mut size = 0;
	assert_eq!(unsafe { conduit_size(host.raw, &mut size) }, ConduitStatus::Ok);
	assert_eq!(size, 1);
}

#[test]
fn setup_json_round_trips() {
	let host = Host::new();
	let handle = host.bridge().create(Doubler).unwrap().as_raw();

	let mut out = ConduitOwnedStr {
		ptr: ptr::null_mut(),
		len: 0,
	};
	assert_eq!(unsafe { conduit_setup_json(host.raw, handle, &mut out) }, ConduitStatus::Ok);

	let json = unsafe { std::str::from_utf8(std::slice::from_raw_parts(out.ptr, out.len)) }
		.unwrap()
		.to_string();
	unsafe { conduit_str_free(out) };

	let setup: ComponentSetup = serde_json::from_str(&json).unwrap();
	assert_eq!(setup, *host.bridge().setup(ComponentHandle::from_raw(handle)).unwrap());
	assert_eq!(setup.partials()[0].rows(), Some(&[0, 1][..]));
}

#[test]
fn linear_mode_is_validated() {
	let host = Host::new();
	let handle = host.bridge().create(Doubler).unwrap().as_raw();
	let empty = ConduitBufferList::EMPTY;
	let status = unsafe { conduit_apply_linear(host.raw, handle, empty, empty, empty, empty, empty, 7) };
	assert_eq!(status, ConduitStatus::InvalidArgument);
	assert!(last_error().contains("linear mode"));
}
