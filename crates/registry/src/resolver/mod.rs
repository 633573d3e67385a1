//! Per-type capability resolution.
//!
//! # Purpose
//!
//! Decides, once per component type, which callbacks the host may invoke, and keeps the
//! dispatch table adapters are built from.
//!
//! # Mental Model
//!
//! Each capability of a type starts `Unchecked` and moves to `Present` or `Absent` on the first
//! [`CapabilityResolver::resolve`] for that type. The verdict is terminal: it depends only on
//! the type's declaration, never on instance state.
//!
//! | Claimed | Registered | Verdict |
//! |---------|------------|---------|
//! | yes     | yes        | Present |
//! | no      | no         | Absent  |
//! | no      | yes        | Absent (callback ignored) |
//! | yes     | no         | Absent with a warning, or an error under [`MissingCallbackPolicy::Reject`] |
//!
//! # Invariants
//!
//! - Must resolve each type at most once.
//!   - Enforced in: [`CapabilityResolver::resolve`] (double-checked cache insert).
//!   - Tested by: [`crate::invariants::test_resolution_runs_once_per_type`]
//!   - Failure symptom: `resolutions()` grows with the instance count.
//!
//! - Must never expose a callback for an Absent capability.
//!   - Enforced in: [`crate::table::CallbackTable::retain`].
//!   - Tested by: [`crate::invariants::test_absent_capability_has_no_adapter`]
//!   - Failure symptom: A host invokes a callback the type did not claim.
//!
//! - Must reject types without `setup`.
//!   - Enforced in: [`CapabilityResolver::resolve`].
//!   - Tested by: `resolver::tests::test_missing_setup_is_fatal`
//!   - Failure symptom: Host wires a component with no declared variables.

use std::any::TypeId;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use tracing::{debug, warn};

use crate::capability::{Capability, CapabilitySet, ComponentKind};
use crate::component::ComponentType;
use crate::config::MissingCallbackPolicy;
use crate::error::{BridgeError, Result};
use crate::table::{CallbackTable, CallbackTableBuilder};

/// Resolution outcome of one capability for one type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
	Present,
	Absent,
}

/// The cached result of resolving a component type.
#[derive(Debug)]
pub struct Resolution {
	type_id: TypeId,
	type_name: &'static str,
	present: CapabilitySet,
	kind: ComponentKind,
	table: CallbackTable,
}

impl Resolution {
	pub fn type_id(&self) -> TypeId {
		self.type_id
	}

	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Every Present capability, `SETUP` included.
	pub fn present(&self) -> CapabilitySet {
		self.present
	}

	pub fn kind(&self) -> ComponentKind {
		self.kind
	}

	pub fn verdict(&self, cap: Capability) -> Verdict {
		if self.present.has(cap) {
			Verdict::Present
		} else {
			Verdict::Absent
		}
	}

	pub fn is_present(&self, cap: Capability) -> bool {
		self.present.has(cap)
	}

	pub(crate) fn table(&self) -> &CallbackTable {
		&self.table
	}
}

/// Resolves and caches capability verdicts keyed by component type.
pub struct CapabilityResolver {
	cache: RwLock<HashMap<TypeId, Arc<Resolution>>>,
	policy: MissingCallbackPolicy,
	resolutions: AtomicUsize,
}

impl CapabilityResolver {
	pub fn new(policy: MissingCallbackPolicy) -> Self {
		Self {
			cache: RwLock::new(HashMap::default()),
			policy,
			resolutions: AtomicUsize::new(0),
		}
	}

	/// Returns the resolution for `T`, inspecting its declaration on first use.
	///
	/// Failures are not cached; resolving a rejected type again fails the same way.
	pub fn resolve<T: ComponentType>(&self) -> Result<Arc<Resolution>> {
		let type_id = TypeId::of::<T>();
		if let Some(resolution) = self.cache.read().get(&type_id) {
			return Ok(Arc::clone(resolution));
		}

		let mut cache = self.cache.write();
		if let Some(resolution) = cache.get(&type_id) {
			return Ok(Arc::clone(resolution));
		}
		let resolution = Arc::new(self.inspect::<T>()?);
		cache.insert(type_id, Arc::clone(&resolution));
		Ok(resolution)
	}

	/// Returns a cached resolution without inspecting anything.
	pub fn cached(&self, type_id: TypeId) -> Option<Arc<Resolution>> {
		self.cache.read().get(&type_id).cloned()
	}

	/// Number of types resolved so far.
	pub fn len(&self) -> usize {
		self.cache.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.cache.read().is_empty()
	}

	/// Number of declaration inspections performed, including failed ones.
	pub fn resolutions(&self) -> usize {
		self.resolutions.load(Ordering::Relaxed)
	}

	pub fn policy(&self) -> MissingCallbackPolicy {
		self.policy
	}

	fn inspect<T: ComponentType>(&self) -> Result<Resolution> {
		self.resolutions.fetch_add(1, Ordering::Relaxed);

		let mut builder = CallbackTableBuilder::<T>::new();
		T::register(&mut builder);
		let mut table = builder.finish();

		let claimed = T::CAPABILITIES;
		let registered = table.registered();
		if !claimed.has(Capability::Setup) || !registered.has(Capability::Setup) {
			return Err(BridgeError::MissingMandatoryCapability { type_name: T::NAME });
		}

		let mut present = CapabilitySet::SETUP;
		for cap in Capability::OPTIONAL {
			match (claimed.has(cap), registered.has(cap)) {
				(true, true) => present |= cap.as_set(),
				(true, false) => match self.policy {
					MissingCallbackPolicy::Advise => warn!(
						domain = "capabilities",
						type_name = T::NAME,
						capability = cap.name(),
						"capability claimed without a callback; treating as absent",
					),
					MissingCallbackPolicy::Reject => {
						return Err(BridgeError::ClaimedWithoutCallback {
							type_name: T::NAME,
							capability: cap,
						});
					}
				},
				(false, true) => debug!(
					domain = "capabilities",
					type_name = T::NAME,
					capability = cap.name(),
					"callback registered but not claimed; ignoring",
				),
				(false, false) => {}
			}
		}

		let kind = ComponentKind::classify(present).ok_or_else(|| BridgeError::KindConflict {
			type_name: T::NAME,
			present: present.capabilities().collect(),
		})?;

		table.retain(present);
		debug!(
			domain = "capabilities",
			type_name = T::NAME,
			kind = kind.as_str(),
			present = ?present,
			"resolved component type",
		);

		Ok(Resolution {
			type_id: TypeId::of::<T>(),
			type_name: T::NAME,
			present,
			kind,
			table,
		})
	}
}

impl Default for CapabilityResolver {
	fn default() -> Self {
		Self::new(MissingCallbackPolicy::default())
	}
}

#[cfg(test)]
mod tests;
