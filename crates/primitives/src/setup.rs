use rustc_hash::FxHashSet as HashSet;
use serde::{Deserialize, Serialize};

use crate::descriptor::{PartialsDescriptor, VariableDescriptor, is_glob};

/// Descriptor validation failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SetupError {
	#[error("duplicate {role} variable '{name}'")]
	DuplicateVariable { role: &'static str, name: String },
	#[error("{role} variable '{name}' has {actual} default values for shape {shape:?}")]
	DefaultLength {
		role: &'static str,
		name: String,
		shape: Vec<usize>,
		actual: usize,
	},
	#[error("partials d({of})/d({wrt}): '{of}' is not a declared output")]
	UnknownOf { of: String, wrt: String },
	#[error("partials d({of})/d({wrt}): '{wrt}' is not a declared variable")]
	UnknownWrt { of: String, wrt: String },
	#[error("partials d({of})/d({wrt}): rows and cols must be declared together")]
	UnpairedSparsity { of: String, wrt: String },
	#[error("partials d({of})/d({wrt}): {rows} rows but {cols} cols")]
	SparsityLength {
		of: String,
		wrt: String,
		rows: usize,
		cols: usize,
	},
	#[error("partials d({of})/d({wrt}): value has {actual} elements, expected {expected}")]
	ValueLength {
		of: String,
		wrt: String,
		expected: usize,
		actual: usize,
	},
}

/// The three descriptor sequences returned by a component's `setup`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComponentSetup {
	#[serde(default)]
	inputs: Vec<VariableDescriptor>,
	#[serde(default)]
	outputs: Vec<VariableDescriptor>,
	#[serde(default)]
	partials: Vec<PartialsDescriptor>,
}

impl ComponentSetup {
	pub fn new(
		inputs: Vec<VariableDescriptor>,
		outputs: Vec<VariableDescriptor>,
		partials: Vec<PartialsDescriptor>,
	) -> Self {
		Self {
			inputs,
			outputs,
			partials,
		}
	}

	pub fn with_input(mut self, var: VariableDescriptor) -> Self {
		self.inputs.push(var);
		self
	}

	pub fn with_output(mut self, var: VariableDescriptor) -> Self {
		self.outputs.push(var);
		self
	}

	pub fn with_partials(mut self, partials: PartialsDescriptor) -> Self {
		self.partials.push(partials);
		self
	}

	pub fn inputs(&self) -> &[VariableDescriptor] {
		&self.inputs
	}

	pub fn outputs(&self) -> &[VariableDescriptor] {
		&self.outputs
	}

	pub fn partials(&self) -> &[PartialsDescriptor] {
		&self.partials
	}

	/// Splits into `(inputs, outputs, partials)`.
	pub fn into_parts(self) -> (Vec<VariableDescriptor>, Vec<VariableDescriptor>, Vec<PartialsDescriptor>) {
		(self.inputs, self.outputs, self.partials)
	}

	/// Size of a declared input or output, searching outputs first.
	pub fn variable_size(&self, name: &str) -> Option<usize> {
		self.outputs
			.iter()
			.chain(&self.inputs)
			.find(|var| var.name() == name)
			.map(VariableDescriptor::size)
	}

	/// Checks the structural invariants the host relies on when wiring the component.
	///
	/// - Variable names are unique within the inputs and within the outputs.
	/// - A default value has one element (broadcast) or exactly `size` elements.
	/// - `of` names a declared output; `wrt` names a declared input or output. Glob patterns
	///   are passed through for the host to expand.
	/// - `rows` and `cols` are declared together and have equal lengths.
	/// - A precomputed value has one element, one per sparsity pair, or `size(of) * size(wrt)`.
	pub fn validate(&self) -> Result<(), SetupError> {
		check_variables("input", &self.inputs)?;
		check_variables("output", &self.outputs)?;

		for partial in &self.partials {
			self.check_partials(partial)?;
		}
		Ok(())
	}

	fn check_partials(&self, partial: &PartialsDescriptor) -> Result<(), SetupError> {
		let (of, wrt) = (partial.of(), partial.wrt());
		let of_size = if is_glob(of) {
			None
		} else {
			let size = self
				.outputs
				.iter()
				.find(|var| var.name() == of)
				.map(VariableDescriptor::size);
			Some(size.ok_or_else(|| SetupError::UnknownOf {
				of: of.to_string(),
				wrt: wrt.to_string(),
			})?)
		};
		let wrt_size = if is_glob(wrt) {
			None
		} else {
			Some(
				self.variable_size(wrt)
					.ok_or_else(|| SetupError::UnknownWrt {
						of: of.to_string(),
						wrt: wrt.to_string(),
					})?,
			)
		};

		let expected = match (partial.rows(), partial.cols()) {
			(Some(rows), Some(cols)) if rows.len() != cols.len() => {
				return Err(SetupError::SparsityLength {
					of: of.to_string(),
					wrt: wrt.to_string(),
					rows: rows.len(),
					cols: cols.len(),
				});
			}
			(Some(rows), Some(_)) => Some(rows.len()),
			(None, None) => of_size.zip(wrt_size).map(|(a, b)| a * b),
			_ => {
				return Err(SetupError::UnpairedSparsity {
					of: of.to_string(),
					wrt: wrt.to_string(),
				});
			}
		};

		if let (Some(value), Some(expected)) = (partial.value(), expected)
			&& value.len() != 1
			&& value.len() != expected
		{
			return Err(SetupError::ValueLength {
				of: of.to_string(),
				wrt: wrt.to_string(),
				expected,
				actual: value.len(),
			});
		}
		Ok(())
	}
}

fn check_variables(role: &'static str, vars: &[VariableDescriptor]) -> Result<(), SetupError> {
	let mut seen = HashSet::default();
	for var in vars {
		if !seen.insert(var.name()) {
			return Err(SetupError::DuplicateVariable {
				role,
				name: var.name().to_string(),
			});
		}
		let len = var.value().len();
		if len != 1 && len != var.size() {
			return Err(SetupError::DefaultLength {
				role,
				name: var.name().to_string(),
				shape: var.shape().to_vec(),
				actual: len,
			});
		}
	}
	Ok(())
}
