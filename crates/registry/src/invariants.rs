#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

use conduit_primitives::{Buffers, BuffersMut, ComponentHandle};

use crate::adapter::{AdapterFactory, AdapterLookup};
use crate::capability::Capability;
use crate::config::MissingCallbackPolicy;
use crate::registry::ComponentRegistry;
use crate::resolver::CapabilityResolver;
use crate::test_fixtures::{Adder, Overclaimer, Scaler};

/// Invariant: Resolution MUST inspect a type's declaration once, however many instances exist.
pub(crate) fn inv_resolution_runs_once_per_type() {
	let resolver = CapabilityResolver::default();
	let registry = ComponentRegistry::new();

	for _ in 0..16 {
		let resolution = resolver.resolve::<Adder>().unwrap();
		registry.create(Adder::default(), resolution).unwrap();
	}
	assert_eq!(resolver.resolutions(), 1);

	let first = resolver.resolve::<Adder>().unwrap();
	let second = resolver.resolve::<Adder>().unwrap();
	assert!(Arc::ptr_eq(&first, &second), "cached resolution must be shared");

	resolver.resolve::<Scaler>().unwrap();
	assert_eq!(resolver.resolutions(), 2);
	assert_eq!(resolver.len(), 2);
}

#[cfg_attr(test, test)]
pub(crate) fn test_resolution_runs_once_per_type() {
	inv_resolution_runs_once_per_type()
}

/// Invariant: An Absent capability MUST NOT be reachable through any adapter.
pub(crate) fn inv_absent_capability_has_no_adapter() {
	let resolver = CapabilityResolver::new(MissingCallbackPolicy::Advise);
	let registry = ComponentRegistry::new();

	// Claimed and not registered.
	let resolution = resolver.resolve::<Overclaimer>().unwrap();
	let factory = AdapterFactory::new(&registry, Arc::clone(&resolution));
	assert!(!resolution.is_present(Capability::ComputePartials));
	assert!(matches!(
		factory.adapter(Capability::ComputePartials),
		AdapterLookup::Unsupported(Capability::ComputePartials)
	));
	assert!(factory.compute_partials().is_none());

	// Neither claimed nor registered.
	let resolution = resolver.resolve::<Adder>().unwrap();
	let factory = AdapterFactory::new(&registry, resolution);
	for cap in Capability::OPTIONAL.into_iter().filter(|cap| *cap != Capability::Compute) {
		assert!(
			!factory.adapter(cap).is_supported(),
			"{cap} must not have an adapter for Adder"
		);
	}
}

#[cfg_attr(test, test)]
pub(crate) fn test_absent_capability_has_no_adapter() {
	inv_absent_capability_has_no_adapter()
}

/// Invariant: Concurrent `create` calls MUST issue pairwise distinct handles.
pub(crate) fn inv_handles_pairwise_distinct() {
	const THREADS: usize = 8;
	const PER_THREAD: usize = 64;

	let resolver = CapabilityResolver::default();
	let registry = ComponentRegistry::new();
	let resolution = resolver.resolve::<Adder>().unwrap();

	let handles: Vec<ComponentHandle> = thread::scope(|scope| {
		let workers: Vec<_> = (0..THREADS)
			.map(|_| {
				let resolution = Arc::clone(&resolution);
				let registry = &registry;
				scope.spawn(move || {
					(0..PER_THREAD)
						.map(|_| registry.create(Adder::default(), Arc::clone(&resolution)).unwrap())
						.collect::<Vec<_>>()
				})
			})
			.collect();
		workers.into_iter().flat_map(|w| w.join().unwrap()).collect()
	});

	let distinct: HashSet<_> = handles.iter().copied().collect();
	assert_eq!(distinct.len(), THREADS * PER_THREAD);
	assert!(!distinct.contains(&ComponentHandle::NULL));
	assert_eq!(registry.size(), THREADS * PER_THREAD);
}

#[cfg_attr(test, test)]
pub(crate) fn test_handles_pairwise_distinct() {
	inv_handles_pairwise_distinct()
}

/// Invariant: `remove` MUST be idempotent and MUST NOT disturb other entries.
pub(crate) fn inv_remove_is_idempotent() {
	let resolver = CapabilityResolver::default();
	let registry = ComponentRegistry::new();
	let resolution = resolver.resolve::<Adder>().unwrap();

	let doomed = registry.create(Adder::default(), Arc::clone(&resolution)).unwrap();
	let kept = registry.create(Adder::default(), resolution).unwrap();

	assert!(registry.remove(doomed));
	assert!(!registry.remove(doomed));
	assert!(!registry.remove(ComponentHandle::from_raw(9_999)));

	assert_eq!(registry.size(), 1);
	assert!(registry.lookup(doomed).unwrap_err().is_handle_not_found());
	assert_eq!(registry.lookup(kept).unwrap().handle(), kept);

	let factory = AdapterFactory::new(&registry, resolver.resolve::<Adder>().unwrap());
	let x = [1.0, 2.0];
	let mut y = [0.0, 0.0];
	let err = factory
		.compute()
		.unwrap()
		.call(doomed, &Buffers::new().with("x", &x), &mut BuffersMut::new().with("y", &mut y))
		.unwrap_err();
	assert!(err.is_handle_not_found());
	assert_eq!(y, [0.0, 0.0]);
}

#[cfg_attr(test, test)]
pub(crate) fn test_remove_is_idempotent() {
	inv_remove_is_idempotent()
}
