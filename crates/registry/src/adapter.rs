//! Stable-signature entry points for Present capabilities.
//!
//! An [`AdapterFactory`] is bound to one resolved component type. It hands out one adapter per
//! Present capability; each adapter takes a handle plus the capability's fixed buffer roles,
//! resolves the handle, and forwards the borrowed buffers to the instance without copying.
//! Asking for an Absent capability yields [`AdapterLookup::Unsupported`] instead.

use std::sync::Arc;

use conduit_primitives::{Buffers, BuffersMut, ComponentHandle, ComponentSetup, LinearMode, PartialsMut};
use tracing::{trace, warn};

use crate::capability::Capability;
use crate::error::{BridgeError, Result};
use crate::registry::{ComponentRef, ComponentRegistry};
use crate::resolver::Resolution;
use crate::table::{
	ApplyLinearFn, ApplyNonlinearFn, ComputeFn, ComputePartialsFn, GuessNonlinearFn, LinearizeFn, SetupFn,
	SolveNonlinearFn, ThunkError, ThunkResult,
};

/// What every adapter needs besides its thunk.
#[derive(Clone)]
struct Target<'r> {
	registry: &'r ComponentRegistry,
	resolution: Arc<Resolution>,
	capability: Capability,
	trace: bool,
}

impl Target<'_> {
	/// Resolves `handle` and checks it belongs to the adapter's type.
	fn acquire(&self, handle: ComponentHandle) -> Result<ComponentRef> {
		let component = self.registry.lookup(handle)?;
		if component.type_id() != self.resolution.type_id() {
			return Err(BridgeError::TypeMismatch {
				handle,
				capability: self.capability,
				expected: self.resolution.type_name(),
				actual: component.type_name(),
			});
		}
		if self.trace {
			trace!(
				domain = "dispatch",
				%handle,
				type_name = self.resolution.type_name(),
				capability = self.capability.name(),
				"dispatch",
			);
		}
		Ok(component)
	}

	fn finish<T>(&self, handle: ComponentHandle, result: ThunkResult<T>) -> Result<T> {
		result.map_err(|err| match err {
			ThunkError::Downcast => BridgeError::TypeMismatch {
				handle,
				capability: self.capability,
				expected: self.resolution.type_name(),
				actual: "<erased>",
			},
			ThunkError::Callback(source) => BridgeError::Callback {
				handle,
				capability: self.capability,
				source,
			},
		})
	}
}

/// Returns the component's validated descriptors, computing them on first call.
pub struct SetupAdapter<'r> {
	target: Target<'r>,
	thunk: SetupFn,
}

impl SetupAdapter<'_> {
	pub fn call(&self, handle: ComponentHandle) -> Result<Arc<ComponentSetup>> {
		let component = self.target.acquire(handle)?;
		if let Some(setup) = component.cached_setup() {
			return Ok(setup);
		}

		let result = {
			let instance = component.lock();
			(self.thunk)(&**instance)
		};
		let setup = self.target.finish(handle, result)?;
		setup.validate().map_err(|source| BridgeError::InvalidSetup {
			type_name: self.target.resolution.type_name(),
			source,
		})?;
		Ok(component.store_setup(setup))
	}
}

pub struct ComputeAdapter<'r> {
	target: Target<'r>,
	thunk: ComputeFn,
}

impl ComputeAdapter<'_> {
	pub fn call(&self, handle: ComponentHandle, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> Result<()> {
		let component = self.target.acquire(handle)?;
		let result = (self.thunk)(&mut **component.lock(), inputs, outputs);
		self.target.finish(handle, result)
	}
}

pub struct ComputePartialsAdapter<'r> {
	target: Target<'r>,
	thunk: ComputePartialsFn,
}

impl ComputePartialsAdapter<'_> {
	pub fn call(&self, handle: ComponentHandle, inputs: &Buffers<'_>, partials: &mut PartialsMut<'_>) -> Result<()> {
		let component = self.target.acquire(handle)?;
		let result = (self.thunk)(&mut **component.lock(), inputs, partials);
		self.target.finish(handle, result)
	}
}

pub struct ApplyNonlinearAdapter<'r> {
	target: Target<'r>,
	thunk: ApplyNonlinearFn,
}

impl ApplyNonlinearAdapter<'_> {
	pub fn call(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		residuals: &mut BuffersMut<'_>,
	) -> Result<()> {
		let component = self.target.acquire(handle)?;
		let result = (self.thunk)(&mut **component.lock(), inputs, outputs, residuals);
		self.target.finish(handle, result)
	}
}

pub struct LinearizeAdapter<'r> {
	target: Target<'r>,
	thunk: LinearizeFn,
}

impl LinearizeAdapter<'_> {
	pub fn call(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		partials: &mut PartialsMut<'_>,
	) -> Result<()> {
		let component = self.target.acquire(handle)?;
		let result = (self.thunk)(&mut **component.lock(), inputs, outputs, partials);
		self.target.finish(handle, result)
	}
}

pub struct GuessNonlinearAdapter<'r> {
	target: Target<'r>,
	thunk: GuessNonlinearFn,
}

impl GuessNonlinearAdapter<'_> {
	pub fn call(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
		residuals: &Buffers<'_>,
	) -> Result<()> {
		let component = self.target.acquire(handle)?;
		let result = (self.thunk)(&mut **component.lock(), inputs, outputs, residuals);
		self.target.finish(handle, result)
	}
}

pub struct SolveNonlinearAdapter<'r> {
	target: Target<'r>,
	thunk: SolveNonlinearFn,
}

impl SolveNonlinearAdapter<'_> {
	pub fn call(&self, handle: ComponentHandle, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> Result<()> {
		let component = self.target.acquire(handle)?;
		let result = (self.thunk)(&mut **component.lock(), inputs, outputs);
		self.target.finish(handle, result)
	}
}

pub struct ApplyLinearAdapter<'r> {
	target: Target<'r>,
	thunk: ApplyLinearFn,
}

impl ApplyLinearAdapter<'_> {
	#[allow(clippy::too_many_arguments)]
	pub fn call(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		d_inputs: &mut BuffersMut<'_>,
		d_outputs: &mut BuffersMut<'_>,
		d_residuals: &mut BuffersMut<'_>,
		mode: LinearMode,
	) -> Result<()> {
		let component = self.target.acquire(handle)?;
		let result = (self.thunk)(
			&mut **component.lock(),
			inputs,
			outputs,
			d_inputs,
			d_outputs,
			d_residuals,
			mode,
		);
		self.target.finish(handle, result)
	}
}

/// An adapter for one Present capability.
pub enum Adapter<'r> {
	Setup(SetupAdapter<'r>),
	Compute(ComputeAdapter<'r>),
	ComputePartials(ComputePartialsAdapter<'r>),
	ApplyNonlinear(ApplyNonlinearAdapter<'r>),
	Linearize(LinearizeAdapter<'r>),
	GuessNonlinear(GuessNonlinearAdapter<'r>),
	SolveNonlinear(SolveNonlinearAdapter<'r>),
	ApplyLinear(ApplyLinearAdapter<'r>),
}

impl Adapter<'_> {
	pub fn capability(&self) -> Capability {
		match self {
			Self::Setup(_) => Capability::Setup,
			Self::Compute(_) => Capability::Compute,
			Self::ComputePartials(_) => Capability::ComputePartials,
			Self::ApplyNonlinear(_) => Capability::ApplyNonlinear,
			Self::Linearize(_) => Capability::Linearize,
			Self::GuessNonlinear(_) => Capability::GuessNonlinear,
			Self::SolveNonlinear(_) => Capability::SolveNonlinear,
			Self::ApplyLinear(_) => Capability::ApplyLinear,
		}
	}
}

impl std::fmt::Debug for Adapter<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("Adapter").field(&self.capability()).finish()
	}
}

/// Result of asking for an adapter: a callable, or the explicit "no adapter" marker.
#[must_use]
#[derive(Debug)]
pub enum AdapterLookup<'r> {
	Supported(Adapter<'r>),
	Unsupported(Capability),
}

impl<'r> AdapterLookup<'r> {
	pub fn is_supported(&self) -> bool {
		matches!(self, Self::Supported(_))
	}

	pub fn into_adapter(self) -> Option<Adapter<'r>> {
		match self {
			Self::Supported(adapter) => Some(adapter),
			Self::Unsupported(_) => None,
		}
	}
}

/// Builds adapters for one resolved component type against one registry.
#[derive(Clone)]
pub struct AdapterFactory<'r> {
	registry: &'r ComponentRegistry,
	resolution: Arc<Resolution>,
	trace: bool,
}

impl<'r> AdapterFactory<'r> {
	pub fn new(registry: &'r ComponentRegistry, resolution: Arc<Resolution>) -> Self {
		Self {
			registry,
			resolution,
			trace: false,
		}
	}

	/// Emits a `trace!` event for every dispatch through adapters built afterwards.
	pub fn with_trace(mut self, enabled: bool) -> Self {
		self.trace = enabled;
		self
	}

	pub fn resolution(&self) -> &Arc<Resolution> {
		&self.resolution
	}

	fn target(&self, capability: Capability) -> Target<'r> {
		Target {
			registry: self.registry,
			resolution: Arc::clone(&self.resolution),
			capability,
			trace: self.trace,
		}
	}

	/// Looks up the adapter for `capability`.
	///
	/// An Absent capability is logged as an advisory and reported as
	/// [`AdapterLookup::Unsupported`].
	pub fn adapter(&self, capability: Capability) -> AdapterLookup<'r> {
		let table = self.resolution.table();
		let target = self.target(capability);
		let adapter = match capability {
			Capability::Setup => table.setup.map(|thunk| Adapter::Setup(SetupAdapter { target, thunk })),
			Capability::Compute => table
				.compute
				.map(|thunk| Adapter::Compute(ComputeAdapter { target, thunk })),
			Capability::ComputePartials => table
				.compute_partials
				.map(|thunk| Adapter::ComputePartials(ComputePartialsAdapter { target, thunk })),
			Capability::ApplyNonlinear => table
				.apply_nonlinear
				.map(|thunk| Adapter::ApplyNonlinear(ApplyNonlinearAdapter { target, thunk })),
			Capability::Linearize => table
				.linearize
				.map(|thunk| Adapter::Linearize(LinearizeAdapter { target, thunk })),
			Capability::GuessNonlinear => table
				.guess_nonlinear
				.map(|thunk| Adapter::GuessNonlinear(GuessNonlinearAdapter { target, thunk })),
			Capability::SolveNonlinear => table
				.solve_nonlinear
				.map(|thunk| Adapter::SolveNonlinear(SolveNonlinearAdapter { target, thunk })),
			Capability::ApplyLinear => table
				.apply_linear
				.map(|thunk| Adapter::ApplyLinear(ApplyLinearAdapter { target, thunk })),
		};

		match adapter {
			Some(adapter) => AdapterLookup::Supported(adapter),
			None => {
				warn!(
					domain = "capabilities",
					type_name = self.resolution.type_name(),
					capability = capability.name(),
					"no adapter for absent capability",
				);
				AdapterLookup::Unsupported(capability)
			}
		}
	}

	/// The setup adapter. Setup is Present for every resolved type.
	pub fn setup(&self) -> Option<SetupAdapter<'r>> {
		self.resolution.table().setup.map(|thunk| SetupAdapter {
			target: self.target(Capability::Setup),
			thunk,
		})
	}

	pub fn compute(&self) -> Option<ComputeAdapter<'r>> {
		self.resolution.table().compute.map(|thunk| ComputeAdapter {
			target: self.target(Capability::Compute),
			thunk,
		})
	}

	pub fn compute_partials(&self) -> Option<ComputePartialsAdapter<'r>> {
		self.resolution
			.table()
			.compute_partials
			.map(|thunk| ComputePartialsAdapter {
				target: self.target(Capability::ComputePartials),
				thunk,
			})
	}

	pub fn apply_nonlinear(&self) -> Option<ApplyNonlinearAdapter<'r>> {
		self.resolution
			.table()
			.apply_nonlinear
			.map(|thunk| ApplyNonlinearAdapter {
				target: self.target(Capability::ApplyNonlinear),
				thunk,
			})
	}

	pub fn linearize(&self) -> Option<LinearizeAdapter<'r>> {
		self.resolution.table().linearize.map(|thunk| LinearizeAdapter {
			target: self.target(Capability::Linearize),
			thunk,
		})
	}

	pub fn guess_nonlinear(&self) -> Option<GuessNonlinearAdapter<'r>> {
		self.resolution
			.table()
			.guess_nonlinear
			.map(|thunk| GuessNonlinearAdapter {
				target: self.target(Capability::GuessNonlinear),
				thunk,
			})
	}

	pub fn solve_nonlinear(&self) -> Option<SolveNonlinearAdapter<'r>> {
		self.resolution
			.table()
			.solve_nonlinear
			.map(|thunk| SolveNonlinearAdapter {
				target: self.target(Capability::SolveNonlinear),
				thunk,
			})
	}

	pub fn apply_linear(&self) -> Option<ApplyLinearAdapter<'r>> {
		self.resolution.table().apply_linear.map(|thunk| ApplyLinearAdapter {
			target: self.target(Capability::ApplyLinear),
			thunk,
		})
	}
}

#[cfg(test)]
mod tests {
	use conduit_primitives::{BufferStore, PartialsStore};

	use super::*;
	use crate::resolver::CapabilityResolver;
	use crate::test_fixtures::{Adder, Dangling, Divider, DivisionByZero, Scaler, SquareRoot};

	#[test]
	fn compute_writes_through_borrowed_buffers() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let resolution = resolver.resolve::<Adder>().unwrap();
		let handle = registry.create(Adder::default(), Arc::clone(&resolution)).unwrap();
		let compute = AdapterFactory::new(&registry, resolution).compute().unwrap();

		let x = [1.0, 2.0];
		let mut y = [0.0, 0.0];
		compute
			.call(handle, &Buffers::new().with("x", &x), &mut BuffersMut::new().with("y", &mut y))
			.unwrap();
		assert_eq!(y, [2.0, 3.0]);

		let calls = registry.lookup(handle).unwrap().with(|adder: &mut Adder| adder.calls);
		assert_eq!(calls, Some(1));
	}

	#[test]
	fn setup_is_validated_and_cached() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let resolution = resolver.resolve::<Scaler>().unwrap();
		let handle = registry.create(Scaler, Arc::clone(&resolution)).unwrap();
		let setup = AdapterFactory::new(&registry, resolution).setup().unwrap();

		let first = setup.call(handle).unwrap();
		let second = setup.call(handle).unwrap();
		assert!(Arc::ptr_eq(&first, &second));
		assert_eq!(first.outputs()[0].name(), "y");
		assert_eq!(first.partials()[0].rows(), Some(&[0, 1][..]));
	}

	#[test]
	fn invalid_setup_is_reported_and_not_cached() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let resolution = resolver.resolve::<Dangling>().unwrap();
		let handle = registry.create(Dangling, Arc::clone(&resolution)).unwrap();
		let setup = AdapterFactory::new(&registry, resolution).setup().unwrap();

		let err = setup.call(handle).unwrap_err();
		assert!(matches!(
			err,
			BridgeError::InvalidSetup {
				type_name: "Dangling",
				source: conduit_primitives::SetupError::UnknownOf { .. },
			}
		));
		assert!(registry.lookup(handle).unwrap().cached_setup().is_none());
	}

	#[test]
	fn callback_error_keeps_its_source() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let resolution = resolver.resolve::<Divider>().unwrap();
		let handle = registry.create(Divider, Arc::clone(&resolution)).unwrap();
		let compute = AdapterFactory::new(&registry, resolution).compute().unwrap();

		let (a, b) = ([1.0], [0.0]);
		let mut q = [0.0];
		let err = compute
			.call(
				handle,
				&Buffers::new().with("a", &a).with("b", &b),
				&mut BuffersMut::new().with("q", &mut q),
			)
			.unwrap_err();

		assert!(matches!(
			err,
			BridgeError::Callback {
				capability: Capability::Compute,
				..
			}
		));
		let source = err.callback_source().unwrap();
		assert_eq!(source.downcast_ref::<DivisionByZero>(), Some(&DivisionByZero));
		assert!(std::error::Error::source(&err).is_some());
	}

	#[test]
	fn adapter_rejects_handle_of_other_type() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let divider = registry
			.create(Divider, resolver.resolve::<Divider>().unwrap())
			.unwrap();
		let compute = AdapterFactory::new(&registry, resolver.resolve::<Adder>().unwrap())
			.compute()
			.unwrap();

		let x = [1.0, 2.0];
		let mut y = [0.0, 0.0];
		let err = compute
			.call(divider, &Buffers::new().with("x", &x), &mut BuffersMut::new().with("y", &mut y))
			.unwrap_err();
		assert!(matches!(
			err,
			BridgeError::TypeMismatch {
				expected: "Adder",
				actual: "Divider",
				..
			}
		));
	}

	#[test]
	fn partials_written_in_place() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let resolution = resolver.resolve::<Scaler>().unwrap();
		let handle = registry.create(Scaler, Arc::clone(&resolution)).unwrap();
		let factory = AdapterFactory::new(&registry, resolution);

		let setup = factory.setup().unwrap().call(handle).unwrap();
		let inputs = BufferStore::inputs_of(&setup);
		let mut partials = PartialsStore::of_setup(&setup);
		factory
			.compute_partials()
			.unwrap()
			.call(handle, &inputs.view(), &mut partials.view_mut())
			.unwrap();

		assert_eq!(partials.get("y", "x"), Some(&[3.0, 3.0][..]));
	}

	#[test]
	fn implicit_adapters_dispatch() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let resolution = resolver.resolve::<SquareRoot>().unwrap();
		let handle = registry.create(SquareRoot, Arc::clone(&resolution)).unwrap();
		let factory = AdapterFactory::new(&registry, resolution).with_trace(true);

		let x = [4.0];
		let inputs = Buffers::new().with("x", &x);

		let mut y = [0.0];
		factory
			.guess_nonlinear()
			.unwrap()
			.call(handle, &inputs, &mut BuffersMut::new().with("y", &mut y), &Buffers::new())
			.unwrap();
		assert_eq!(y, [4.0]);

		factory
			.solve_nonlinear()
			.unwrap()
			.call(handle, &inputs, &mut BuffersMut::new().with("y", &mut y))
			.unwrap();
		assert_eq!(y, [2.0]);

		let mut r = [1.0];
		factory
			.apply_nonlinear()
			.unwrap()
			.call(handle, &inputs, &Buffers::new().with("y", &y), &mut BuffersMut::new().with("y", &mut r))
			.unwrap();
		assert_eq!(r, [0.0]);

		let (mut dydx, mut dydy) = ([0.0], [0.0]);
		factory
			.linearize()
			.unwrap()
			.call(
				handle,
				&inputs,
				&Buffers::new().with("y", &y),
				&mut PartialsMut::new().with("y", "x", &mut dydx).with("y", "y", &mut dydy),
			)
			.unwrap();
		assert_eq!((dydx, dydy), ([-1.0], [4.0]));

		let (mut dx, mut dy, mut dr) = ([1.0], [0.5], [0.0]);
		factory
			.apply_linear()
			.unwrap()
			.call(
				handle,
				&inputs,
				&Buffers::new().with("y", &y),
				&mut BuffersMut::new().with("x", &mut dx),
				&mut BuffersMut::new().with("y", &mut dy),
				&mut BuffersMut::new().with("y", &mut dr),
				LinearMode::Fwd,
			)
			.unwrap();
		assert_eq!(dr, [1.0]);
	}

	#[test]
	fn lookup_marks_absent_capabilities() {
		let resolver = CapabilityResolver::default();
		let registry = ComponentRegistry::new();
		let factory = AdapterFactory::new(&registry, resolver.resolve::<Adder>().unwrap());

		match factory.adapter(Capability::Compute) {
			AdapterLookup::Supported(adapter) => assert_eq!(adapter.capability(), Capability::Compute),
			AdapterLookup::Unsupported(cap) => panic!("compute unexpectedly unsupported: {cap}"),
		}
		assert!(matches!(
			factory.adapter(Capability::ComputePartials),
			AdapterLookup::Unsupported(Capability::ComputePartials)
		));
		assert!(factory.adapter(Capability::ComputePartials).into_adapter().is_none());
	}
}
