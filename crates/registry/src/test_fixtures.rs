//! Component types shared by unit tests and invariant checks.

use conduit_primitives::{
	Buffers, BuffersMut, ComponentSetup, LinearMode, PartialsDescriptor, PartialsMut, VariableDescriptor,
};

use crate::capability::CapabilitySet;
use crate::component::{
	ApplyLinear, ApplyNonlinear, ComponentType, Compute, ComputePartials, GuessNonlinear, Linearize, Setup,
	SolveNonlinear,
};
use crate::error::CallbackResult;
use crate::table::CallbackTableBuilder;

/// `y = x + 1`, explicit, no partials.
#[derive(Debug, Default)]
pub(crate) struct Adder {
	pub calls: usize,
}

impl Setup for Adder {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default()
			.with_input(VariableDescriptor::new("x").with_shape([2]))
			.with_output(VariableDescriptor::new("y").with_shape([2])))
	}
}

impl Compute for Adder {
	fn compute(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult {
		self.calls += 1;
		let x = inputs.require("x")?;
		let y = outputs.require_mut("y")?;
		for (y, x) in y.iter_mut().zip(x) {
			*y = x + 1.0;
		}
		Ok(())
	}
}

crate::component_type!(Adder => [setup, compute]);

/// `y = 3x` with exact diagonal partials.
#[derive(Debug, Default)]
pub(crate) struct Scaler;

impl Setup for Scaler {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default()
			.with_input(VariableDescriptor::new("x").with_shape([2]))
			.with_output(VariableDescriptor::new("y").with_shape([2]))
			.with_partials(PartialsDescriptor::new("y", "x").with_sparsity([0, 1], [0, 1])))
	}
}

impl Compute for Scaler {
	fn compute(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult {
		let x = inputs.require("x")?;
		let y = outputs.require_mut("y")?;
		for (y, x) in y.iter_mut().zip(x) {
			*y = 3.0 * x;
		}
		Ok(())
	}
}

impl ComputePartials for Scaler {
	fn compute_partials(&mut self, _inputs: &Buffers<'_>, partials: &mut PartialsMut<'_>) -> CallbackResult {
		partials.require_mut("y", "x")?.fill(3.0);
		Ok(())
	}
}

crate::component_type!(Scaler => [setup, compute, compute_partials]);

/// Error raised by [`Divider`] on a zero divisor.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("division by zero")]
pub(crate) struct DivisionByZero;

/// `q = a / b`; fails when `b` is zero.
#[derive(Debug, Default)]
pub(crate) struct Divider;

impl Setup for Divider {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default()
			.with_input(VariableDescriptor::new("a"))
			.with_input(VariableDescriptor::new("b"))
			.with_output(VariableDescriptor::new("q")))
	}
}

impl Compute for Divider {
	fn compute(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult {
		let a = inputs.require("a")?[0];
		let b = inputs.require("b")?[0];
		if b == 0.0 {
			return Err(DivisionByZero.into());
		}
		outputs.require_mut("q")?[0] = a / b;
		Ok(())
	}
}

crate::component_type!(Divider => [setup, compute]);

/// Residual `R(x, y) = y^2 - x`, solved for `y >= 0`.
#[derive(Debug, Default)]
pub(crate) struct SquareRoot;

impl Setup for SquareRoot {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default()
			.with_input(VariableDescriptor::new("x"))
			.with_output(VariableDescriptor::new("y"))
			.with_partials(PartialsDescriptor::new("y", "x"))
			.with_partials(PartialsDescriptor::new("y", "y")))
	}
}

impl ApplyNonlinear for SquareRoot {
	fn apply_nonlinear(
		&mut self,
		inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		residuals: &mut BuffersMut<'_>,
	) -> CallbackResult {
		let x = inputs.require("x")?[0];
		let y = outputs.require("y")?[0];
		residuals.require_mut("y")?[0] = y * y - x;
		Ok(())
	}
}

impl Linearize for SquareRoot {
	fn linearize(&mut self, _inputs: &Buffers<'_>, outputs: &Buffers<'_>, partials: &mut PartialsMut<'_>) -> CallbackResult {
		let y = outputs.require("y")?[0];
		partials.require_mut("y", "x")?[0] = -1.0;
		partials.require_mut("y", "y")?[0] = 2.0 * y;
		Ok(())
	}
}

impl GuessNonlinear for SquareRoot {
	fn guess_nonlinear(
		&mut self,
		inputs: &Buffers<'_>,
		outputs: &mut BuffersMut<'_>,
		_residuals: &Buffers<'_>,
	) -> CallbackResult {
		let x = inputs.require("x")?[0];
		outputs.require_mut("y")?[0] = x.max(1.0);
		Ok(())
	}
}

impl SolveNonlinear for SquareRoot {
	fn solve_nonlinear(&mut self, inputs: &Buffers<'_>, outputs: &mut BuffersMut<'_>) -> CallbackResult {
		let x = inputs.require("x")?[0];
		outputs.require_mut("y")?[0] = x.sqrt();
		Ok(())
	}
}

impl ApplyLinear for SquareRoot {
	fn apply_linear(
		&mut self,
		_inputs: &Buffers<'_>,
		outputs: &Buffers<'_>,
		d_inputs: &mut BuffersMut<'_>,
		d_outputs: &mut BuffersMut<'_>,
		d_residuals: &mut BuffersMut<'_>,
		mode: LinearMode,
	) -> CallbackResult {
		let y = outputs.require("y")?[0];
		match mode {
			LinearMode::Fwd => {
				let dx = d_inputs.require("x")?[0];
				let dy = d_outputs.require("y")?[0];
				d_residuals.require_mut("y")?[0] += 2.0 * y * dy - dx;
			}
			LinearMode::Rev => {
				let dr = d_residuals.require("y")?[0];
				d_inputs.require_mut("x")?[0] -= dr;
				d_outputs.require_mut("y")?[0] += 2.0 * y * dr;
			}
		}
		Ok(())
	}
}

crate::component_type!(SquareRoot as "square_root" => [
	setup,
	apply_nonlinear,
	linearize,
	guess_nonlinear,
	solve_nonlinear,
	apply_linear,
]);

/// Claims `compute` but never registers `setup`.
#[derive(Debug, Default)]
pub(crate) struct Headless;

impl Compute for Headless {
	fn compute(&mut self, _inputs: &Buffers<'_>, _outputs: &mut BuffersMut<'_>) -> CallbackResult {
		Ok(())
	}
}

impl ComponentType for Headless {
	const NAME: &'static str = "Headless";
	const CAPABILITIES: CapabilitySet = CapabilitySet::SETUP.union(CapabilitySet::COMPUTE);

	fn register(table: &mut CallbackTableBuilder<Self>) {
		table.compute();
	}
}

/// Claims `compute_partials` without registering it.
#[derive(Debug, Default)]
pub(crate) struct Overclaimer;

impl Setup for Overclaimer {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default())
	}
}

impl Compute for Overclaimer {
	fn compute(&mut self, _inputs: &Buffers<'_>, _outputs: &mut BuffersMut<'_>) -> CallbackResult {
		Ok(())
	}
}

impl ComponentType for Overclaimer {
	const NAME: &'static str = "Overclaimer";
	const CAPABILITIES: CapabilitySet = CapabilitySet::SETUP
		.union(CapabilitySet::COMPUTE)
		.union(CapabilitySet::COMPUTE_PARTIALS);

	fn register(table: &mut CallbackTableBuilder<Self>) {
		table.setup().compute();
	}
}

/// Registers `compute_partials` without claiming it.
#[derive(Debug, Default)]
pub(crate) struct Underclaimer;

impl Setup for Underclaimer {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default())
	}
}

impl Compute for Underclaimer {
	fn compute(&mut self, _inputs: &Buffers<'_>, _outputs: &mut BuffersMut<'_>) -> CallbackResult {
		Ok(())
	}
}

impl ComputePartials for Underclaimer {
	fn compute_partials(&mut self, _inputs: &Buffers<'_>, _partials: &mut PartialsMut<'_>) -> CallbackResult {
		Ok(())
	}
}

impl ComponentType for Underclaimer {
	const NAME: &'static str = "Underclaimer";
	const CAPABILITIES: CapabilitySet = CapabilitySet::SETUP.union(CapabilitySet::COMPUTE);

	fn register(table: &mut CallbackTableBuilder<Self>) {
		table.setup().compute().compute_partials();
	}
}

/// Mixes `compute` with `apply_nonlinear`.
#[derive(Debug, Default)]
pub(crate) struct Hybrid;

impl Setup for Hybrid {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default())
	}
}

impl Compute for Hybrid {
	fn compute(&mut self, _inputs: &Buffers<'_>, _outputs: &mut BuffersMut<'_>) -> CallbackResult {
		Ok(())
	}
}

impl ApplyNonlinear for Hybrid {
	fn apply_nonlinear(
		&mut self,
		_inputs: &Buffers<'_>,
		_outputs: &Buffers<'_>,
		_residuals: &mut BuffersMut<'_>,
	) -> CallbackResult {
		Ok(())
	}
}

crate::component_type!(Hybrid => [setup, compute, apply_nonlinear]);

/// Declares a partial against a variable it never declares.
#[derive(Debug, Default)]
pub(crate) struct Dangling;

impl Setup for Dangling {
	fn setup(&self) -> CallbackResult<ComponentSetup> {
		Ok(ComponentSetup::default()
			.with_input(VariableDescriptor::new("x"))
			.with_output(VariableDescriptor::new("y"))
			.with_partials(PartialsDescriptor::new("z", "x")))
	}
}

crate::component_type!(Dangling => [setup]);
