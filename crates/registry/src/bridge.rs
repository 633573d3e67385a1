//! The host-facing facade.
//!
//! A [`Bridge`] owns one registry and one resolver configured from a [`BridgeConfig`]. Hosts
//! that only need one boundary use it directly; hosts that want finer control can drive the
//! [`ComponentRegistry`], [`CapabilityResolver`], and [`AdapterFactory`] themselves.

use std::sync::Arc;

use conduit_primitives::{Buffers, BuffersMut, ComponentHandle, ComponentSetup, LinearMode, PartialsMut};
use tracing::warn;

use crate::adapter::{AdapterFactory, AdapterLookup};
use crate::capability::{Capability, CapabilitySet};
use crate::component::ComponentType;
use crate::config::BridgeConfig;
use crate::error::{BridgeError, Result};
use crate::registry::{ComponentRef, ComponentRegistry};
use crate::resolver::{CapabilityResolver, Resolution, Verdict};

/// Registry, resolver, and adapter factory behind one handle-based API.
pub struct Bridge {
	config: BridgeConfig,
	registry: ComponentRegistry,
	resolver: CapabilityResolver,
}

impl Bridge {
	pub fn new(config: BridgeConfig) -> Self {
		Self {
			registry: ComponentRegistry::starting_at(config.first_handle),
			resolver: CapabilityResolver::new(config.missing_callback),
			config,
		}
	}

	pub fn config(&self) -> &BridgeConfig {
		&self.config
	}

	pub fn registry(&self) -> &ComponentRegistry {
		&self.registry
	}

	pub fn resolver(&self) -> &CapabilityResolver {
		&self.resolver
	}

	/// Resolves `T` and registers `component` under a fresh handle.
	///
	/// The first registration of a type without `setup` fails with
	/// [`BridgeError::MissingMandatoryCapability`] and stores nothing.
	pub fn create<T: ComponentType>(&self, component: T) -> Result<ComponentHandle> {
		let resolution = self.resolver.resolve::<T>()?;
		self.registry.create(component, resolution)
	}

	/// Releases a component. Idempotent.
	pub fn remove(&self, handle: ComponentHandle) -> bool {
		self.registry.remove(handle)
	}

	pub fn lookup(&self, handle: ComponentHandle) -> Result<ComponentRef> {
		self.registry.lookup(handle)
	}

	pub fn size(&self) -> usize {
		self.registry.size()
	}

	pub fn contains(&self, handle: ComponentHandle) -> bool {
		self.registry.contains(handle)
	}

	pub fn handles(&self) -> Vec<ComponentHandle> {
		self.registry.handles()
	}

	pub fn type_name(&self, handle: ComponentHandle) -> Result<&'static str> {
		Ok(self.registry.lookup(handle)?.type_name())
	}

	pub fn resolve<T: ComponentType>(&self) -> Result<Arc<Resolution>> {
		self.resolver.resolve::<T>()
	}

	/// Present capabilities of the handle's type.
	pub fn capabilities(&self, handle: ComponentHandle) -> Result<CapabilitySet> {
		Ok(self.registry.lookup(handle)?.resolution().present())
	}

	pub fn verdict(&self, handle: ComponentHandle, capability: Capability) -> Result<Verdict> {
		Ok(self.registry.lookup(handle)?.resolution().verdict(capability))
	}

	/// Adapter factory for `T`, resolving it if needed.
	pub fn adapters<T: ComponentType>(&self) -> Result<AdapterFactory<'_>> {
		let resolution = self.resolver.resolve::<T>()?;
		Ok(self.factory(resolution))
	}

	/// Adapter factory for the type behind `handle`.
	pub fn adapters_for(&self, handle: ComponentHandle) -> Result<AdapterFactory<'_>> {
		let component = self.registry.lookup(handle)?;
		Ok(self.factory(Arc::clone(component.resolution())))
	}

	pub fn adapter(&self, handle: ComponentHandle, capability: Capability) -> Result<AdapterLookup<'_>> {
		Ok(self.adapters_for(handle)?.adapter(capability))
	}

	fn factory(&self, resolution: Arc<Resolution>) -> AdapterFactory<'_> {
		AdapterFactory::new(&self.registry, resolution).with_trace(self.config.trace_dispatch)
	}

	/// Validated descriptors of the component, computed once per component.
	pub fn setup(&self, handle: ComponentHandle) -> Result<Arc<ComponentSetup>> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory.setup().ok_or_else(|| unsupported(&factory, Capability::Setup))?;
		adapter.call(handle)
	}

	pub fn compute(&self, handle: ComponentHandle, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> Result<()> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory.compute().ok_or_else(|| unsupported(&factory, Capability::Compute))?;
		adapter.call(handle, inputs, outputs)
	}

	pub fn compute_partials(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		partials: &mut PartialsMut<'_>,
	) -> Result<()> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory
			.compute_partials()
			.ok_or_else(|| unsupported(&factory, Capability::ComputePartials))?;
		adapter.call(handle, inputs, partials)
	}

	pub fn apply_nonlinear(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		residuals: &mut BuffersMut<'_>,
	) -> Result<()> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory
			.apply_nonlinear()
			.ok_or_else(|| unsupported(&factory, Capability::ApplyNonlinear))?;
		adapter.call(handle, inputs, outputs, residuals)
	}

	pub fn linearize(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		partials: &mut PartialsMut<'_>,
	) -> Result<()> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory
			.linearize()
			.ok_or_else(|| unsupported(&factory, Capability::Linearize))?;
		adapter.call(handle, inputs, outputs, partials)
	}

	pub fn guess_nonlinear(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
		residuals: &Buffers<'_>,
	) -> Result<()> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory
			.guess_nonlinear()
			.ok_or_else(|| unsupported(&factory, Capability::GuessNonlinear))?;
		adapter.call(handle, inputs, outputs, residuals)
	}

	pub fn solve_nonlinear(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
	) -> Result<()> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory
			.solve_nonlinear()
			.ok_or_else(|| unsupported(&factory, Capability::SolveNonlinear))?;
		adapter.call(handle, inputs, outputs)
	}

	#[allow(clippy::too_many_arguments)]
	pub fn apply_linear(
		&self,
		handle: ComponentHandle,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		d_inputs: &mut BuffersMut<'_>,
		d_outputs: &mut BuffersMut<'_>,
		d_residuals: &mut BuffersMut<'_>,
		mode: LinearMode,
	) -> Result<()> {
		let factory = self.adapters_for(handle)?;
		let adapter = factory
			.apply_linear()
			.ok_or_else(|| unsupported(&factory, Capability::ApplyLinear))?;
		adapter.call(handle, inputs, outputs, d_inputs, d_outputs, d_residuals, mode)
	}
}

/// Direct invocation of an Absent capability.
fn unsupported(factory: &AdapterFactory<'_>, capability: Capability) -> BridgeError {
	let type_name = factory.resolution().type_name();
	warn!(
		domain = "capabilities",
		type_name,
		capability = capability.name(),
		"invocation of absent capability",
	);
	BridgeError::Unsupported { type_name, capability }
}

impl Default for Bridge {
	fn default() -> Self {
		Self::new(BridgeConfig::default())
	}
}
