//! Metadata records a component returns from `setup`.
//!
//! Both record types are immutable once built: fields are private and only the builder methods
//! consume `self`. The serde representation is the wire shape exchanged with the host:
//!
//! ```text
//! VariableDescriptor { name, value, shape, units?, lower?, upper?, tags }
//! PartialsDescriptor { of, wrt, rows?, cols?, value?, method }
//! ```

use serde::{Deserialize, Serialize};

fn default_value() -> Vec<f64> {
	vec![1.0]
}

fn default_shape() -> Vec<usize> {
	vec![1]
}

/// One declared input or output variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDescriptor {
	name: String,
	#[serde(default = "default_value")]
	value: Vec<f64>,
	#[serde(default = "default_shape")]
	shape: Vec<usize>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	units: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	lower: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	upper: Option<f64>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	tags: Vec<String>,
}

impl VariableDescriptor {
	/// Creates a scalar variable with default value `1.0`.
	pub fn new(name: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			value: default_value(),
			shape: default_shape(),
			units: None,
			lower: None,
			upper: None,
			tags: Vec::new(),
		}
	}

	/// Sets the default value. A single element is broadcast over the whole shape.
	pub fn with_value(mut self, value: impl Into<Vec<f64>>) -> Self {
		self.value = value.into();
		self
	}

	/// Sets the shape.
	pub fn with_shape(mut self, shape: impl Into<Vec<usize>>) -> Self {
		self.shape = shape.into();
		self
	}

	/// Sets the physical units string.
	pub fn with_units(mut self, units: impl Into<String>) -> Self {
		self.units = Some(units.into());
		self
	}

	/// Sets lower and upper bounds. Meaningful for outputs of implicit components.
	pub fn with_bounds(mut self, lower: Option<f64>, upper: Option<f64>) -> Self {
		self.lower = lower;
		self.upper = upper;
		self
	}

	/// Adds a free-form tag.
	pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
		self.tags.push(tag.into());
		self
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn value(&self) -> &[f64] {
		&self.value
	}

	pub fn shape(&self) -> &[usize] {
		&self.shape
	}

	pub fn units(&self) -> Option<&str> {
		self.units.as_deref()
	}

	pub fn lower(&self) -> Option<f64> {
		self.lower
	}

	pub fn upper(&self) -> Option<f64> {
		self.upper
	}

	pub fn tags(&self) -> &[String] {
		&self.tags
	}

	/// Number of scalar elements implied by the shape. An empty shape is a scalar.
	pub fn size(&self) -> usize {
		self.shape.iter().product()
	}

	/// Expands the default value to a full-length array.
	pub fn default_array(&self) -> Vec<f64> {
		match self.value.as_slice() {
			[scalar] => vec![*scalar; self.size()],
			values => values.to_vec(),
		}
	}
}

/// How the host should obtain the values of a declared partials block.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialsMethod {
	/// The component computes the derivatives itself.
	#[default]
	Exact,
	/// The host approximates them with finite differences.
	Fd,
	/// The host approximates them with complex step.
	Cs,
}

impl PartialsMethod {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Exact => "exact",
			Self::Fd => "fd",
			Self::Cs => "cs",
		}
	}
}

/// One declared partial-derivative block `d(of)/d(wrt)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartialsDescriptor {
	of: String,
	wrt: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	rows: Option<Vec<usize>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	cols: Option<Vec<usize>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	value: Option<Vec<f64>>,
	#[serde(default)]
	method: PartialsMethod,
}

impl PartialsDescriptor {
	/// Declares a dense block with no precomputed value.
	pub fn new(of: impl Into<String>, wrt: impl Into<String>) -> Self {
		Self {
			of: of.into(),
			wrt: wrt.into(),
			rows: None,
			cols: None,
			value: None,
			method: PartialsMethod::Exact,
		}
	}

	/// Declares a sparsity pattern as paired row/column index sequences.
	pub fn with_sparsity(mut self, rows: impl Into<Vec<usize>>, cols: impl Into<Vec<usize>>) -> Self {
		self.rows = Some(rows.into());
		self.cols = Some(cols.into());
		self
	}

	/// Declares a constant, precomputed value for the block.
	pub fn with_value(mut self, value: impl Into<Vec<f64>>) -> Self {
		self.value = Some(value.into());
		self
	}

	pub fn with_method(mut self, method: PartialsMethod) -> Self {
		self.method = method;
		self
	}

	pub fn of(&self) -> &str {
		&self.of
	}

	pub fn wrt(&self) -> &str {
		&self.wrt
	}

	pub fn rows(&self) -> Option<&[usize]> {
		self.rows.as_deref()
	}

	pub fn cols(&self) -> Option<&[usize]> {
		self.cols.as_deref()
	}

	pub fn value(&self) -> Option<&[f64]> {
		self.value.as_deref()
	}

	pub fn method(&self) -> PartialsMethod {
		self.method
	}

	/// Returns true when the block declares a sparsity pattern.
	pub fn is_sparse(&self) -> bool {
		self.rows.is_some() || self.cols.is_some()
	}

	/// Returns true when `of` or `wrt` is a glob pattern the host expands.
	pub fn is_pattern(&self) -> bool {
		is_glob(&self.of) || is_glob(&self.wrt)
	}
}

pub(crate) fn is_glob(name: &str) -> bool {
	name.contains(['*', '?', '['])
}
