//! Borrowed buffer views passed to component callbacks.
//!
//! # Aliasing contract
//!
//! A buffer is a named numeric array shared by reference for the duration of one callback:
//!
//! - Views borrow host storage for `'a`. A component cannot keep a view past the call because
//!   the callback receives `&Buffers<'_>`/`&mut BuffersMut<'_>` and no owned handle to `'a`.
//! - Views are slices, so a component can write elements but never resize the storage.
//! - Read-only roles ([`Buffers`]) hand out `&[f64]`; writable roles ([`BuffersMut`],
//!   [`PartialsMut`]) hand out `&mut [f64]` only through `&mut self`.
//! - The host must not touch the storage while a call is in flight. Safe Rust hosts get this
//!   from the borrow checker; C hosts must uphold it themselves.
//!
//! Lookups never copy element data.

use indexmap::{Equivalent, IndexMap};

use crate::setup::ComponentSetup;

/// Error returned when a callback asks for a buffer the host did not pass.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
	#[error("missing buffer '{0}'")]
	Missing(String),
	#[error("missing partials buffer d({of})/d({wrt})")]
	MissingPartials { of: String, wrt: String },
}

/// Read-only named views, in insertion order.
#[derive(Debug, Default)]
pub struct Buffers<'a> {
	entries: IndexMap<&'a str, &'a [f64]>,
}

impl<'a> Buffers<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a view, consuming and returning `self` for chaining.
	pub fn with(mut self, name: &'a str, data: &'a [f64]) -> Self {
		self.insert(name, data);
		self
	}

	/// Inserts a view; a repeated name replaces the earlier view in place.
	pub fn insert(&mut self, name: &'a str, data: &'a [f64]) -> Option<&'a [f64]> {
		self.entries.insert(name, data)
	}

	pub fn get(&self, name: &str) -> Option<&[f64]> {
		self.entries.get(name).copied()
	}

	/// Like [`Self::get`], but a missing name is an error the callback can propagate with `?`.
	pub fn require(&self, name: &str) -> Result<&[f64], BufferError> {
		self.get(name).ok_or_else(|| BufferError::Missing(name.to_string()))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
		self.entries.keys().copied()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a [f64])> + '_ {
		self.entries.iter().map(|(name, data)| (*name, *data))
	}
}

impl<'a> FromIterator<(&'a str, &'a [f64])> for Buffers<'a> {
	fn from_iter<I: IntoIterator<Item = (&'a str, &'a [f64])>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

/// Writable named views, in insertion order.
#[derive(Debug, Default)]
pub struct BuffersMut<'a> {
	entries: IndexMap<&'a str, &'a mut [f64]>,
}

impl<'a> BuffersMut<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, name: &'a str, data: &'a mut [f64]) -> Self {
		self.insert(name, data);
		self
	}

	pub fn insert(&mut self, name: &'a str, data: &'a mut [f64]) -> Option<&'a mut [f64]> {
		self.entries.insert(name, data)
	}

	pub fn get(&self, name: &str) -> Option<&[f64]> {
		self.entries.get(name).map(|data| &**data)
	}

	pub fn get_mut(&mut self, name: &str) -> Option<&mut [f64]> {
		self.entries.get_mut(name).map(|data| &mut **data)
	}

	pub fn require(&self, name: &str) -> Result<&[f64], BufferError> {
		self.get(name).ok_or_else(|| BufferError::Missing(name.to_string()))
	}

	pub fn require_mut(&mut self, name: &str) -> Result<&mut [f64], BufferError> {
		self.get_mut(name).ok_or_else(|| BufferError::Missing(name.to_string()))
	}

	pub fn contains(&self, name: &str) -> bool {
		self.entries.contains_key(name)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn names(&self) -> impl Iterator<Item = &'a str> + '_ {
		self.entries.keys().copied()
	}

	/// Reborrows every view read-only for the lifetime of `&self`.
	pub fn as_read(&self) -> Buffers<'_> {
		self.entries.iter().map(|(name, data)| (*name, &**data)).collect()
	}

	pub fn iter_mut(&mut self) -> impl Iterator<Item = (&'a str, &mut [f64])> + '_ {
		self.entries.iter_mut().map(|(name, data)| (*name, &mut **data))
	}
}

impl<'a> FromIterator<(&'a str, &'a mut [f64])> for BuffersMut<'a> {
	fn from_iter<I: IntoIterator<Item = (&'a str, &'a mut [f64])>>(iter: I) -> Self {
		Self {
			entries: iter.into_iter().collect(),
		}
	}
}

/// Key of a partials view: the block `d(of)/d(wrt)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PartialsKey<'a> {
	pub of: &'a str,
	pub wrt: &'a str,
}

/// Borrowed lookup key that matches a stored [`PartialsKey`] of any lifetime.
#[derive(Hash)]
struct PartialsQuery<'q> {
	of: &'q str,
	wrt: &'q str,
}

impl<'a> Equivalent<PartialsKey<'a>> for PartialsQuery<'_> {
	fn equivalent(&self, key: &PartialsKey<'a>) -> bool {
		self.of == key.of && self.wrt == key.wrt
	}
}

/// Writable partials views keyed by `(of, wrt)`, in insertion order.
///
/// Each view holds the nonzero values of one block: one element per `(row, col)` pair for a
/// sparse block, or `size(of) * size(wrt)` row-major elements for a dense one.
#[derive(Debug, Default)]
pub struct PartialsMut<'a> {
	entries: IndexMap<PartialsKey<'a>, &'a mut [f64]>,
}

impl<'a> PartialsMut<'a> {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with(mut self, of: &'a str, wrt: &'a str, data: &'a mut [f64]) -> Self {
		self.insert(of, wrt, data);
		self
	}

	pub fn insert(&mut self, of: &'a str, wrt: &'a str, data: &'a mut [f64]) -> Option<&'a mut [f64]> {
		self.entries.insert(PartialsKey { of, wrt }, data)
	}

	pub fn get(&self, of: &str, wrt: &str) -> Option<&[f64]> {
		self.entries.get(&PartialsQuery { of, wrt }).map(|data| &**data)
	}

	pub fn get_mut(&mut self, of: &str, wrt: &str) -> Option<&mut [f64]> {
		self.entries
			.get_mut(&PartialsQuery { of, wrt })
			.map(|data| &mut **data)
	}

	pub fn require_mut(&mut self, of: &str, wrt: &str) -> Result<&mut [f64], BufferError> {
		self.get_mut(of, wrt).ok_or_else(|| BufferError::MissingPartials {
			of: of.to_string(),
			wrt: wrt.to_string(),
		})
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn keys(&self) -> impl Iterator<Item = PartialsKey<'a>> + '_ {
		self.entries.keys().copied()
	}
}

/// Direction of a matrix-free linear product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinearMode {
	/// Jacobian-vector product: reads `d_inputs`/`d_outputs`, writes `d_residuals`.
	Fwd,
	/// Transposed product: reads `d_residuals`, writes `d_inputs`/`d_outputs`.
	Rev,
}

impl LinearMode {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Fwd => "fwd",
			Self::Rev => "rev",
		}
	}
}

impl std::str::FromStr for LinearMode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"fwd" => Ok(Self::Fwd),
			"rev" => Ok(Self::Rev),
			other => Err(format!("unknown linear mode '{other}' (expected 'fwd' or 'rev')")),
		}
	}
}

/// Host-side owned storage that hands out views for one call at a time.
///
/// Allocated from `setup` descriptors so array lengths match what the component declared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferStore {
	arrays: IndexMap<String, Vec<f64>>,
}

impl BufferStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocates one array per input, filled with the declared defaults.
	pub fn inputs_of(setup: &ComponentSetup) -> Self {
		Self::from_descriptors(setup.inputs())
	}

	/// Allocates one array per output, filled with the declared defaults.
	pub fn outputs_of(setup: &ComponentSetup) -> Self {
		Self::from_descriptors(setup.outputs())
	}

	/// Allocates one zeroed array per output, sized like [`Self::outputs_of`].
	pub fn residuals_of(setup: &ComponentSetup) -> Self {
		Self {
			arrays: setup
				.outputs()
				.iter()
				.map(|var| (var.name().to_string(), vec![0.0; var.size()]))
				.collect(),
		}
	}

	fn from_descriptors(vars: &[crate::VariableDescriptor]) -> Self {
		Self {
			arrays: vars
				.iter()
				.map(|var| (var.name().to_string(), var.default_array()))
				.collect(),
		}
	}

	/// Inserts or replaces an array.
	pub fn set(&mut self, name: impl Into<String>, data: impl Into<Vec<f64>>) -> &mut Self {
		self.arrays.insert(name.into(), data.into());
		self
	}

	pub fn get(&self, name: &str) -> Option<&[f64]> {
		self.arrays.get(name).map(Vec::as_slice)
	}

	pub fn len(&self) -> usize {
		self.arrays.len()
	}

	pub fn is_empty(&self) -> bool {
		self.arrays.is_empty()
	}

	pub fn view(&self) -> Buffers<'_> {
		self.arrays
			.iter()
			.map(|(name, data)| (name.as_str(), data.as_slice()))
			.collect()
	}

	pub fn view_mut(&mut self) -> BuffersMut<'_> {
		self.arrays
			.iter_mut()
			.map(|(name, data)| (name.as_str(), data.as_mut_slice()))
			.collect()
	}
}

/// Host-side owned storage for partials blocks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartialsStore {
	blocks: IndexMap<(String, String), Vec<f64>>,
}

impl PartialsStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Allocates one zeroed block per concrete partials declaration.
	///
	/// Sparse blocks get one element per `(row, col)` pair; dense blocks get
	/// `size(of) * size(wrt)`. Glob-pattern declarations are left to the host to expand.
	pub fn of_setup(setup: &ComponentSetup) -> Self {
		let mut store = Self::new();
		for partial in setup.partials().iter().filter(|p| !p.is_pattern()) {
			let len = match partial.rows() {
				Some(rows) => rows.len(),
				None => {
					let of = setup.variable_size(partial.of()).unwrap_or(0);
					let wrt = setup.variable_size(partial.wrt()).unwrap_or(0);
					of * wrt
				}
			};
			store.set(partial.of(), partial.wrt(), vec![0.0; len]);
		}
		store
	}

	pub fn set(&mut self, of: impl Into<String>, wrt: impl Into<String>, data: impl Into<Vec<f64>>) -> &mut Self {
		self.blocks.insert((of.into(), wrt.into()), data.into());
		self
	}

	pub fn get(&self, of: &str, wrt: &str) -> Option<&[f64]> {
		self.blocks
			.iter()
			.find(|((o, w), _)| o == of && w == wrt)
			.map(|(_, data)| data.as_slice())
	}

	pub fn len(&self) -> usize {
		self.blocks.len()
	}

	pub fn is_empty(&self) -> bool {
		self.blocks.is_empty()
	}

	pub fn view_mut(&mut self) -> PartialsMut<'_> {
		let mut view = PartialsMut::new();
		for ((of, wrt), data) in self.blocks.iter_mut() {
			view.insert(of.as_str(), wrt.as_str(), data.as_mut_slice());
		}
		view
	}
}
