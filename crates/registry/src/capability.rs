/// One callback of the fixed component interface.
///
/// `Setup` is mandatory; the remaining seven are optional and form two families. Explicit
/// components map inputs to outputs directly, implicit components expose residuals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Capability {
	/// Declares variables and partials. Mandatory.
	Setup,
	/// `compute(inputs, outputs)`.
	Compute,
	/// `compute_partials(inputs, partials)`.
	ComputePartials,
	/// `apply_nonlinear(inputs, outputs, residuals)`.
	ApplyNonlinear,
	/// `linearize(inputs, outputs, partials)`.
	Linearize,
	/// `guess_nonlinear(inputs, outputs, residuals)`.
	GuessNonlinear,
	/// `solve_nonlinear(inputs, outputs)`.
	SolveNonlinear,
	/// `apply_linear(inputs, outputs, d_inputs, d_outputs, d_residuals, mode)`.
	ApplyLinear,
}

bitflags::bitflags! {
	/// A set of component capabilities.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct CapabilitySet: u32 {
		/// Declares variables and partials.
		const SETUP = 1 << 0;
		/// Explicit output evaluation.
		const COMPUTE = 1 << 1;
		/// Explicit partial derivatives.
		const COMPUTE_PARTIALS = 1 << 2;
		/// Implicit residual evaluation.
		const APPLY_NONLINEAR = 1 << 3;
		/// Implicit partial derivatives.
		const LINEARIZE = 1 << 4;
		/// Initial guess for implicit outputs.
		const GUESS_NONLINEAR = 1 << 5;
		/// Component-local nonlinear solve.
		const SOLVE_NONLINEAR = 1 << 6;
		/// Matrix-free linear products.
		const APPLY_LINEAR = 1 << 7;

		/// Callbacks of explicit components.
		const EXPLICIT = Self::COMPUTE.bits() | Self::COMPUTE_PARTIALS.bits();
		/// Callbacks of implicit components.
		const IMPLICIT = Self::APPLY_NONLINEAR.bits()
			| Self::LINEARIZE.bits()
			| Self::GUESS_NONLINEAR.bits()
			| Self::SOLVE_NONLINEAR.bits()
			| Self::APPLY_LINEAR.bits();
		/// Every optional callback.
		const OPTIONAL = Self::EXPLICIT.bits() | Self::IMPLICIT.bits();
	}
}

impl Capability {
	/// Every capability, `Setup` first, in protocol order.
	pub const ALL: [Capability; 8] = [
		Self::Setup,
		Self::Compute,
		Self::ComputePartials,
		Self::ApplyNonlinear,
		Self::Linearize,
		Self::GuessNonlinear,
		Self::SolveNonlinear,
		Self::ApplyLinear,
	];

	/// The seven optional capabilities.
	pub const OPTIONAL: [Capability; 7] = [
		Self::Compute,
		Self::ComputePartials,
		Self::ApplyNonlinear,
		Self::Linearize,
		Self::GuessNonlinear,
		Self::SolveNonlinear,
		Self::ApplyLinear,
	];

	/// Returns the bitflag for this capability.
	pub const fn as_set(self) -> CapabilitySet {
		match self {
			Self::Setup => CapabilitySet::SETUP,
			Self::Compute => CapabilitySet::COMPUTE,
			Self::ComputePartials => CapabilitySet::COMPUTE_PARTIALS,
			Self::ApplyNonlinear => CapabilitySet::APPLY_NONLINEAR,
			Self::Linearize => CapabilitySet::LINEARIZE,
			Self::GuessNonlinear => CapabilitySet::GUESS_NONLINEAR,
			Self::SolveNonlinear => CapabilitySet::SOLVE_NONLINEAR,
			Self::ApplyLinear => CapabilitySet::APPLY_LINEAR,
		}
	}

	/// Protocol name of the callback.
	pub const fn name(self) -> &'static str {
		match self {
			Self::Setup => "setup",
			Self::Compute => "compute",
			Self::ComputePartials => "compute_partials",
			Self::ApplyNonlinear => "apply_nonlinear",
			Self::Linearize => "linearize",
			Self::GuessNonlinear => "guess_nonlinear",
			Self::SolveNonlinear => "solve_nonlinear",
			Self::ApplyLinear => "apply_linear",
		}
	}

	/// Position in [`Self::ALL`]; the stable numeric code used across the C boundary.
	pub const fn index(self) -> u32 {
		self as u32
	}

	pub fn from_index(index: u32) -> Option<Self> {
		Self::ALL.get(index as usize).copied()
	}

	pub const fn is_optional(self) -> bool {
		!matches!(self, Self::Setup)
	}
}

impl std::fmt::Display for Capability {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.name())
	}
}

impl std::str::FromStr for Capability {
	type Err = UnknownCapability;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Self::ALL
			.into_iter()
			.find(|cap| cap.name() == s)
			.ok_or_else(|| UnknownCapability(s.to_string()))
	}
}

/// A capability name outside the fixed protocol.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown capability '{0}'")]
pub struct UnknownCapability(pub String);

impl From<Capability> for CapabilitySet {
	fn from(cap: Capability) -> Self {
		cap.as_set()
	}
}

impl FromIterator<Capability> for CapabilitySet {
	fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
		let mut set = CapabilitySet::empty();
		for cap in iter {
			set |= cap.as_set();
		}
		set
	}
}

impl CapabilitySet {
	/// Returns true when `cap` is in the set.
	#[inline]
	pub const fn has(self, cap: Capability) -> bool {
		self.contains(cap.as_set())
	}

	/// Iterates the members in protocol order.
	pub fn capabilities(self) -> impl Iterator<Item = Capability> {
		Capability::ALL.into_iter().filter(move |cap| self.has(*cap))
	}
}

/// Which callback family a component type belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
	/// Outputs are explicit functions of inputs.
	Explicit,
	/// Outputs are defined by driving residuals to zero.
	Implicit,
}

impl ComponentKind {
	/// Classifies a set of present callbacks. Returns `None` when both families are mixed.
	///
	/// A set with no optional callbacks is explicit.
	pub fn classify(set: CapabilitySet) -> Option<Self> {
		let explicit = set.intersects(CapabilitySet::EXPLICIT);
		let implicit = set.intersects(CapabilitySet::IMPLICIT);
		match (explicit, implicit) {
			(true, true) => None,
			(_, true) => Some(Self::Implicit),
			_ => Some(Self::Explicit),
		}
	}

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Explicit => "explicit",
			Self::Implicit => "implicit",
		}
	}
}
