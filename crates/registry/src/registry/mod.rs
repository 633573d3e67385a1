//! Handle-to-instance registry.
//!
//! # Role
//!
//! Owns every live component on behalf of the boundary. The host only ever holds
//! [`ComponentHandle`]s; this module turns them back into instances.
//!
//! # Concurrency
//!
//! - **Map:** `create`/`remove` take the write lock, `lookup` the read lock. Neither lock is held
//!   while a callback runs.
//! - **Instances:** each instance sits behind its own mutex, held for exactly one dispatched call.
//! - **Handles:** issued from an atomic counter, so two racing `create`s never share a handle.
//!
//! # Invariants
//!
//! - Must issue pairwise distinct handles and never reuse one.
//!   - Enforced in: [`ComponentRegistry::create`] (monotonic counter).
//!   - Tested by: [`crate::invariants::test_handles_pairwise_distinct`]
//!   - Failure symptom: Host-side wrappers alias one another's component.
//!
//! - Must treat `remove` as idempotent.
//!   - Enforced in: [`ComponentRegistry::remove`].
//!   - Tested by: [`crate::invariants::test_remove_is_idempotent`]
//!   - Failure symptom: Host teardown errors on double dispose.
//!
//! - Must keep an instance alive while a call that resolved it is in flight.
//!   - Enforced in: [`ComponentRef`] (holds `Arc<Slot>`).
//!   - Tested by: `registry::tests::test_reference_outlives_removal`
//!   - Failure symptom: Use-after-free when the host disposes mid-call.

use std::any::{Any, TypeId};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use conduit_primitives::{ComponentHandle, ComponentSetup};
use parking_lot::{Mutex, MutexGuard, RwLock};
use rustc_hash::FxHashMap as HashMap;
use tracing::debug;

use crate::component::ComponentType;
use crate::error::{BridgeError, Result};
use crate::resolver::Resolution;

/// One registry entry.
struct Slot {
	handle: ComponentHandle,
	resolution: Arc<Resolution>,
	instance: Mutex<Box<dyn Any + Send>>,
	setup: OnceLock<Arc<ComponentSetup>>,
}

/// Shared reference to a registry-resident component.
///
/// Keeps the instance alive even if its handle is removed while the reference is held.
#[derive(Clone)]
pub struct ComponentRef {
	slot: Arc<Slot>,
}

impl ComponentRef {
	pub fn handle(&self) -> ComponentHandle {
		self.slot.handle
	}

	pub fn type_name(&self) -> &'static str {
		self.slot.resolution.type_name()
	}

	pub fn type_id(&self) -> TypeId {
		Resolution::type_id(&self.slot.resolution)
	}

	pub fn resolution(&self) -> &Arc<Resolution> {
		&self.slot.resolution
	}

	/// Runs `f` with exclusive access to the instance as its concrete type.
	///
	/// Returns `None` when the component is not a `T`.
	pub fn with<T: 'static, R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
		let mut instance = self.slot.instance.lock();
		instance.downcast_mut::<T>().map(f)
	}

	/// Locks the erased instance for one dispatched call.
	pub(crate) fn lock(&self) -> MutexGuard<'_, Box<dyn Any + Send>> {
		self.slot.instance.lock()
	}

	pub(crate) fn cached_setup(&self) -> Option<Arc<ComponentSetup>> {
		self.slot.setup.get().cloned()
	}

	/// Stores the validated setup; the first stored value wins.
	pub(crate) fn store_setup(&self, setup: ComponentSetup) -> Arc<ComponentSetup> {
		let _ = self.slot.setup.set(Arc::new(setup));
		self.slot.setup.get().cloned().unwrap_or_default()
	}
}

impl std::fmt::Debug for ComponentRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ComponentRef")
			.field("handle", &self.slot.handle)
			.field("type_name", &self.type_name())
			.finish()
	}
}

/// Maps opaque handles to live component instances.
pub struct ComponentRegistry {
	entries: RwLock<HashMap<ComponentHandle, Arc<Slot>>>,
	next: AtomicU64,
}

impl ComponentRegistry {
	/// Creates an empty registry issuing handles from `1`.
	pub fn new() -> Self {
		Self::starting_at(1)
	}

	/// Creates an empty registry whose first handle is `first` (clamped to at least 1).
	pub fn starting_at(first: u64) -> Self {
		Self {
			entries: RwLock::new(HashMap::default()),
			next: AtomicU64::new(first.max(1)),
		}
	}

	/// Stores `component` under a fresh handle.
	///
	/// `resolution` must be the resolution of `T`; anything else is a
	/// [`BridgeError::TypeMismatch`] and no handle is issued.
	pub fn create<T: ComponentType>(&self, component: T, resolution: Arc<Resolution>) -> Result<ComponentHandle> {
		if Resolution::type_id(&resolution) != TypeId::of::<T>() {
			return Err(BridgeError::TypeMismatch {
				handle: ComponentHandle::NULL,
				capability: crate::Capability::Setup,
				expected: resolution.type_name(),
				actual: T::NAME,
			});
		}

		let handle = ComponentHandle::from_raw(self.next.fetch_add(1, Ordering::Relaxed));
		let slot = Arc::new(Slot {
			handle,
			resolution,
			instance: Mutex::new(Box::new(component)),
			setup: OnceLock::new(),
		});
		self.entries.write().insert(handle, slot);
		debug!(domain = "registry", %handle, type_name = T::NAME, "component created");
		Ok(handle)
	}

	/// Resolves a handle to its component.
	pub fn lookup(&self, handle: ComponentHandle) -> Result<ComponentRef> {
		self.entries
			.read()
			.get(&handle)
			.map(|slot| ComponentRef { slot: Arc::clone(slot) })
			.ok_or(BridgeError::HandleNotFound(handle))
	}

	/// Releases the registry's hold on a component. Removing an absent handle is a no-op.
	///
	/// Returns whether an entry was released.
	pub fn remove(&self, handle: ComponentHandle) -> bool {
		let removed = self.entries.write().remove(&handle);
		match removed {
			Some(slot) => {
				debug!(
					domain = "registry",
					%handle,
					type_name = slot.resolution.type_name(),
					"component removed",
				);
				true
			}
			None => false,
		}
	}

	/// Number of live entries.
	pub fn size(&self) -> usize {
		self.entries.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.read().is_empty()
	}

	pub fn contains(&self, handle: ComponentHandle) -> bool {
		self.entries.read().contains_key(&handle)
	}

	/// Live handles in ascending order.
	pub fn handles(&self) -> Vec<ComponentHandle> {
		let mut handles: Vec<_> = self.entries.read().keys().copied().collect();
		handles.sort_unstable();
		handles
	}
}

impl Default for ComponentRegistry {
	fn default() -> Self {
		Self::new()
	}
}
