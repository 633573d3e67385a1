//! The component interface.
//!
//! Each callback is its own trait so that "does this type implement `linearize` with the right
//! signature" is a compile-time trait bound rather than a runtime lookup. A component type
//! implements the callback traits it supports, then declares them through [`ComponentType`]:
//!
//! ```rust,ignore
//! struct Adder;
//!
//! impl Setup for Adder {
//!     fn setup(&self) -> CallbackResult<ComponentSetup> { /* ... */ }
//! }
//!
//! impl Compute for Adder {
//!     fn compute(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult {
//!         /* ... */
//!     }
//! }
//!
//! conduit_registry::component_type!(Adder => [setup, compute]);
//! ```

use conduit_primitives::{Buffers, BuffersMut, ComponentSetup, LinearMode, PartialsMut};

use crate::capability::CapabilitySet;
use crate::error::CallbackResult;
use crate::table::CallbackTableBuilder;

/// Mandatory: declares the component's variables and partials.
pub trait Setup {
	fn setup(&self) -> CallbackResult<ComponentSetup>;
}

pub trait Compute {
	fn compute(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult;
}

pub trait ComputePartials {
	fn compute_partials(&mut self, inputs: &Buffers<'_>, partials: &mut PartialsMut<'_>) -> CallbackResult;
}

pub trait ApplyNonlinear {
	fn apply_nonlinear(
		&mut self,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		residuals: &mut BuffersMut<'_>,
	) -> CallbackResult;
}

pub trait Linearize {
	fn linearize(&mut self, inputs: &Buffers<'_>, outputs: &Buffers<'_>, partials: &mut PartialsMut<'_>) -> CallbackResult;
}

pub trait GuessNonlinear {
	fn guess_nonlinear(
		&mut self,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
		residuals: &Buffers<'_>,
	) -> CallbackResult;
}

pub trait SolveNonlinear {
	fn solve_nonlinear(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult;
}

/// Matrix-free linear products.
///
/// In [`LinearMode::Fwd`] the component reads `d_inputs`/`d_outputs` and accumulates into
/// `d_residuals`; in [`LinearMode::Rev`] it reads `d_residuals` and accumulates into
/// `d_inputs`/`d_outputs`.
pub trait ApplyLinear {
	#[allow(clippy::too_many_arguments)]
	fn apply_linear(
		&mut self,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		d_inputs: &mut BuffersMut<'_>,
		d_outputs: &mut BuffersMut<'_>,
		d_residuals: &mut BuffersMut<'_>,
		mode: LinearMode,
	) -> CallbackResult;
}

/// Type-level declaration of which callbacks a component type provides.
///
/// [`Self::CAPABILITIES`] is the presence predicate: the set the type claims. [`Self::register`]
/// stores a callback for each capability it implements. A capability resolves Present only
/// when it is both claimed and registered.
pub trait ComponentType: Send + Sized + 'static {
	/// Name used in logs and errors.
	const NAME: &'static str;

	/// Capabilities this type claims, including [`CapabilitySet::SETUP`].
	const CAPABILITIES: CapabilitySet;

	/// Registers one callback per implemented capability.
	fn register(table: &mut CallbackTableBuilder<Self>);
}

/// Implements [`ComponentType`] so that claims and registrations come from one list.
///
/// ```rust,ignore
/// component_type!(Adder => [setup, compute]);
/// component_type!(Quadratic as "quadratic" => [setup, apply_nonlinear, linearize]);
/// ```
#[macro_export]
macro_rules! component_type {
	($ty:ty => [$($cap:ident),+ $(,)?]) => {
		$crate::component_type!($ty as stringify!($ty) => [$($cap),+]);
	};
	($ty:ty as $name:expr => [$($cap:ident),+ $(,)?]) => {
		impl $crate::ComponentType for $ty {
			const NAME: &'static str = $name;
			const CAPABILITIES: $crate::CapabilitySet =
				$crate::CapabilitySet::empty()$(.union($crate::__capability_flag!($cap)))+;

			fn register(table: &mut $crate::CallbackTableBuilder<Self>) {
				$(table.$cap();)+
			}
		}
	};
}

/// Maps a callback name to its [`CapabilitySet`] flag.
#[doc(hidden)]
#[macro_export]
macro_rules! __capability_flag {
	(setup) => {
		$crate::CapabilitySet::SETUP
	};
	(compute) => {
		$crate::CapabilitySet::COMPUTE
	};
	(compute_partials) => {
		$crate::CapabilitySet::COMPUTE_PARTIALS
	};
	(apply_nonlinear) => {
		$crate::CapabilitySet::APPLY_NONLINEAR
	};
	(linearize) => {
		$crate::CapabilitySet::LINEARIZE
	};
	(guess_nonlinear) => {
		$crate::CapabilitySet::GUESS_NONLINEAR
	};
	(solve_nonlinear) => {
		$crate::CapabilitySet::SOLVE_NONLINEAR
	};
	(apply_linear) => {
		$crate::CapabilitySet::APPLY_LINEAR
	};
}
