//! Per-type dispatch tables.
//!
//! A [`CallbackTable`] maps each capability to a type-erased function pointer. Every pointer
//! is a monomorphized thunk that downcasts the stored instance to the concrete component type
//! and calls its trait method, so dispatch after resolution is one indirect call with no
//! per-call lookup.

use std::any::Any;
use std::marker::PhantomData;

use conduit_primitives::{Buffers, BuffersMut, ComponentSetup, LinearMode, PartialsMut};

use crate::capability::{Capability, CapabilitySet};
use crate::component::{
	ApplyLinear, ApplyNonlinear, ComponentType, Compute, ComputePartials, GuessNonlinear, Linearize, Setup,
	SolveNonlinear,
};
use crate::error::CallbackResult;

/// Outcome of a thunk before handle and capability context is attached.
#[derive(Debug)]
pub(crate) enum ThunkError {
	/// The erased instance is not the type the thunk was built for.
	Downcast,
	/// The component's callback failed.
	Callback(crate::CallbackError),
}

pub(crate) type ThunkResult<T = ()> = Result<T, ThunkError>;

pub(crate) type SetupFn = fn(&dyn Any) -> ThunkResult<ComponentSetup>;
pub(crate) type ComputeFn = fn(&mut dyn Any, &Buffers<'_>, &mut BuffersMut<'_>) -> ThunkResult;
pub(crate) type ComputePartialsFn = fn(&mut dyn Any, &Buffers<'_>, &mut PartialsMut<'_>) -> ThunkResult;
pub(crate) type ApplyNonlinearFn = fn(&mut dyn Any, &Buffers<'_>, &Buffers<'_>, &mut BuffersMut<'_>) -> ThunkResult;
pub(crate) type LinearizeFn = fn(&mut dyn Any, &Buffers<'_>, &Buffers<'_>, &mut PartialsMut<'_>) -> ThunkResult;
pub(crate) type GuessNonlinearFn = fn(&mut dyn Any, &Buffers<'_>, &mut BuffersMut<'_>, &Buffers<'_>) -> ThunkResult;
pub(crate) type SolveNonlinearFn = fn(&mut dyn Any, &Buffers<'_>, &mut BuffersMut<'_>) -> ThunkResult;
pub(crate) type ApplyLinearFn = fn(
	&mut dyn Any,
	&Buffers<'_>,
	&Buffers<'_>,
	&mut BuffersMut<'_>,
	&mut BuffersMut<'_>,
	&mut BuffersMut<'_>,
	LinearMode,
) -> ThunkResult;

/// Type-erased callbacks of one component type.
#[derive(Clone, Copy, Default)]
pub struct CallbackTable {
	pub(crate) setup: Option<SetupFn>,
	pub(crate) compute: Option<ComputeFn>,
	pub(crate) compute_partials: Option<ComputePartialsFn>,
	pub(crate) apply_nonlinear: Option<ApplyNonlinearFn>,
	pub(crate) linearize: Option<LinearizeFn>,
	pub(crate) guess_nonlinear: Option<GuessNonlinearFn>,
	pub(crate) solve_nonlinear: Option<SolveNonlinearFn>,
	pub(crate) apply_linear: Option<ApplyLinearFn>,
}

impl CallbackTable {
	/// The capabilities that have a registered callback.
	pub fn registered(&self) -> CapabilitySet {
		Capability::ALL
			.into_iter()
			.filter(|cap| self.has(*cap))
			.collect()
	}

	pub fn has(&self, cap: Capability) -> bool {
		match cap {
			Capability::Setup => self.setup.is_some(),
			Capability::Compute => self.compute.is_some(),
			Capability::ComputePartials => self.compute_partials.is_some(),
			Capability::ApplyNonlinear => self.apply_nonlinear.is_some(),
			Capability::Linearize => self.linearize.is_some(),
			Capability::GuessNonlinear => self.guess_nonlinear.is_some(),
			Capability::SolveNonlinear => self.solve_nonlinear.is_some(),
			Capability::ApplyLinear => self.apply_linear.is_some(),
		}
	}

	/// Drops every callback outside `keep`, so Absent capabilities cannot be dispatched.
	pub(crate) fn retain(&mut self, keep: CapabilitySet) {
		if !keep.has(Capability::Setup) {
			self.setup = None;
		}
		if !keep.has(Capability::Compute) {
			self.compute = None;
		}
		if !keep.has(Capability::ComputePartials) {
			self.compute_partials = None;
		}
		if !keep.has(Capability::ApplyNonlinear) {
			self.apply_nonlinear = None;
		}
		if !keep.has(Capability::Linearize) {
			self.linearize = None;
		}
		if !keep.has(Capability::GuessNonlinear) {
			self.guess_nonlinear = None;
		}
		if !keep.has(Capability::SolveNonlinear) {
			self.solve_nonlinear = None;
		}
		if !keep.has(Capability::ApplyLinear) {
			self.apply_linear = None;
		}
	}
}

impl std::fmt::Debug for CallbackTable {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_tuple("CallbackTable").field(&self.registered()).finish()
	}
}

/// Typed registration surface handed to [`ComponentType::register`].
///
/// Each method is bounded on the matching callback trait, so a type can only register the
/// callbacks whose signatures it actually implements.
pub struct CallbackTableBuilder<T> {
	table: CallbackTable,
	_marker: PhantomData<fn() -> T>,
}

impl<T: ComponentType> CallbackTableBuilder<T> {
	pub(crate) fn new() -> Self {
		Self {
			table: CallbackTable::default(),
			_marker: PhantomData,
		}
	}

	pub(crate) fn finish(self) -> CallbackTable {
		self.table
	}

	pub fn setup(&mut self) -> &mut Self
	where
		T: Setup,
	{
		self.table.setup = Some(thunk::setup::<T>);
		self
	}

	pub fn compute(&mut self) -> &mut Self
	where
		T: Compute,
	{
		self.table.compute = Some(thunk::compute::<T>);
		self
	}

	pub fn compute_partials(&mut self) -> &mut Self
	where
		T: ComputePartials,
	{
		self.table.compute_partials = Some(thunk::compute_partials::<T>);
		self
	}

	pub fn apply_nonlinear(&mut self) -> &mut Self
	where
		T: ApplyNonlinear,
	{
		self.table.apply_nonlinear = Some(thunk::apply_nonlinear::<T>);
		self
	}

	pub fn linearize(&mut self) -> &mut Self
	where
		T: Linearize,
	{
		self.table.linearize = Some(thunk::linearize::<T>);
		self
	}

	pub fn guess_nonlinear(&mut self) -> &mut Self
	where
		T: GuessNonlinear,
	{
		self.table.guess_nonlinear = Some(thunk::guess_nonlinear::<T>);
		self
	}

	pub fn solve_nonlinear(&mut self) -> &mut Self
	where
		T: SolveNonlinear,
	{
		self.table.solve_nonlinear = Some(thunk::solve_nonlinear::<T>);
		self
	}

	pub fn apply_linear(&mut self) -> &mut Self
	where
		T: ApplyLinear,
	{
		self.table.apply_linear = Some(thunk::apply_linear::<T>);
		self
	}
}

mod thunk {
	use super::*;

	fn cast<T: 'static>(instance: &mut dyn Any) -> ThunkResult<&mut T> {
		instance.downcast_mut::<T>().ok_or(ThunkError::Downcast)
	}

	fn lift(result: CallbackResult) -> ThunkResult {
		result.map_err(ThunkError::Callback)
	}

	pub(super) fn setup<T: Setup + 'static>(instance: &dyn Any) -> ThunkResult<ComponentSetup> {
		let component = instance.downcast_ref::<T>().ok_or(ThunkError::Downcast)?;
		component.setup().map_err(ThunkError::Callback)
	}

	pub(super) fn compute<T: Compute + 'static>(
		instance: &mut dyn Any,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
	) -> ThunkResult {
		lift(cast::<T>(instance)?.compute(inputs, outputs))
	}

	pub(super) fn compute_partials<T: ComputePartials + 'static>(
		instance: &mut dyn Any,
		inputs: &Buffers<'_>,
		partials: &mut PartialsMut<'_>,
	) -> ThunkResult {
		lift(cast::<T>(instance)?.compute_partials(inputs, partials))
	}

	pub(super) fn apply_nonlinear<T: ApplyNonlinear + 'static>(
		instance: &mut dyn Any,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		residuals: &mut BuffersMut<'_>,
	) -> ThunkResult {
		lift(cast::<T>(instance)?.apply_nonlinear(inputs, outputs, residuals))
	}

	pub(super) fn linearize<T: Linearize + 'static>(
		instance: &mut dyn Any,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		partials: &mut PartialsMut<'_>,
	) -> ThunkResult {
		lift(cast::<T>(instance)?.linearize(inputs, outputs, partials))
	}

	pub(super) fn guess_nonlinear<T: GuessNonlinear + 'static>(
		instance: &mut dyn Any,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
		residuals: &Buffers<'_>,
	) -> ThunkResult {
		lift(cast::<T>(instance)?.guess_nonlinear(inputs, outputs, residuals))
	}

	pub(super) fn solve_nonlinear<T: SolveNonlinear + 'static>(
		instance: &mut dyn Any,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
	) -> ThunkResult {
		lift(cast::<T>(instance)?.solve_nonlinear(inputs, outputs))
	}

	pub(super) fn apply_linear<T: ApplyLinear + 'static>(
		instance: &mut dyn Any,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		d_inputs: &mut BuffersMut<'_>,
		d_outputs: &mut BuffersMut<'_>,
		d_residuals: &mut BuffersMut<'_>,
		mode: LinearMode,
	) -> ThunkResult {
		lift(cast::<T>(instance)?.apply_linear(inputs, outputs, d_inputs, d_outputs, d_residuals, mode))
	}
}
