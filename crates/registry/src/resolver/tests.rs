use rstest::rstest;

use super::*;
use crate::test_fixtures::{Adder, Headless, Hybrid, Overclaimer, Scaler, SquareRoot, Underclaimer};

#[test]
fn test_missing_setup_is_fatal() {
	let resolver = CapabilityResolver::default();
	let err = resolver.resolve::<Headless>().unwrap_err();
	assert!(matches!(
		err,
		BridgeError::MissingMandatoryCapability { type_name: "Headless" }
	));

	// Not cached: a second attempt inspects again and fails again.
	assert!(resolver.resolve::<Headless>().is_err());
	assert_eq!(resolver.resolutions(), 2);
	assert!(resolver.is_empty());
}

#[rstest]
#[case::setup(Capability::Setup, Verdict::Present)]
#[case::compute(Capability::Compute, Verdict::Present)]
#[case::compute_partials(Capability::ComputePartials, Verdict::Absent)]
#[case::apply_nonlinear(Capability::ApplyNonlinear, Verdict::Absent)]
#[case::linearize(Capability::Linearize, Verdict::Absent)]
#[case::guess_nonlinear(Capability::GuessNonlinear, Verdict::Absent)]
#[case::solve_nonlinear(Capability::SolveNonlinear, Verdict::Absent)]
#[case::apply_linear(Capability::ApplyLinear, Verdict::Absent)]
fn adder_verdicts(#[case] cap: Capability, #[case] expected: Verdict) {
	let resolution = CapabilityResolver::default().resolve::<Adder>().unwrap();
	assert_eq!(resolution.verdict(cap), expected);
	assert_eq!(resolution.table().has(cap), expected == Verdict::Present);
}

#[rstest]
#[case::setup(Capability::Setup, Verdict::Present)]
#[case::compute(Capability::Compute, Verdict::Absent)]
#[case::compute_partials(Capability::ComputePartials, Verdict::Absent)]
#[case::apply_nonlinear(Capability::ApplyNonlinear, Verdict::Present)]
#[case::linearize(Capability::Linearize, Verdict::Present)]
#[case::guess_nonlinear(Capability::GuessNonlinear, Verdict::Present)]
#[case::solve_nonlinear(Capability::SolveNonlinear, Verdict::Present)]
#[case::apply_linear(Capability::ApplyLinear, Verdict::Present)]
fn implicit_verdicts(#[case] cap: Capability, #[case] expected: Verdict) {
	let resolution = CapabilityResolver::default().resolve::<SquareRoot>().unwrap();
	assert_eq!(resolution.verdict(cap), expected);
}

#[test]
fn kinds_follow_present_family() {
	let resolver = CapabilityResolver::default();
	assert_eq!(resolver.resolve::<Adder>().unwrap().kind(), ComponentKind::Explicit);
	assert_eq!(resolver.resolve::<Scaler>().unwrap().kind(), ComponentKind::Explicit);
	assert_eq!(resolver.resolve::<SquareRoot>().unwrap().kind(), ComponentKind::Implicit);
	assert_eq!(resolver.resolve::<SquareRoot>().unwrap().type_name(), "square_root");
}

#[test]
fn mixed_families_conflict() {
	let err = CapabilityResolver::default().resolve::<Hybrid>().unwrap_err();
	match err {
		BridgeError::KindConflict { type_name, present } => {
			assert_eq!(type_name, "Hybrid");
			assert_eq!(
				present,
				vec![Capability::Setup, Capability::Compute, Capability::ApplyNonlinear]
			);
		}
		other => panic!("expected KindConflict, got {other:?}"),
	}
}

#[test]
fn claimed_without_callback_is_absent_when_advising() {
	let resolver = CapabilityResolver::new(MissingCallbackPolicy::Advise);
	let resolution = resolver.resolve::<Overclaimer>().unwrap();
	assert_eq!(resolution.verdict(Capability::ComputePartials), Verdict::Absent);
	assert_eq!(resolution.present(), CapabilitySet::SETUP | CapabilitySet::COMPUTE);
}

#[test]
fn claimed_without_callback_fails_when_rejecting() {
	let resolver = CapabilityResolver::new(MissingCallbackPolicy::Reject);
	let err = resolver.resolve::<Overclaimer>().unwrap_err();
	assert!(matches!(
		err,
		BridgeError::ClaimedWithoutCallback {
			type_name: "Overclaimer",
			capability: Capability::ComputePartials,
		}
	));
	assert!(resolver.cached(TypeId::of::<Overclaimer>()).is_none());
}

#[test]
fn unclaimed_callback_is_dropped() {
	let resolution = CapabilityResolver::default().resolve::<Underclaimer>().unwrap();
	assert_eq!(resolution.verdict(Capability::ComputePartials), Verdict::Absent);
	assert!(!resolution.table().has(Capability::ComputePartials));
}

#[test]
fn cached_lookup_by_type_id() {
	let resolver = CapabilityResolver::default();
	assert!(resolver.cached(TypeId::of::<Adder>()).is_none());
	let resolution = resolver.resolve::<Adder>().unwrap();
	let cached = resolver.cached(TypeId::of::<Adder>()).unwrap();
	assert!(Arc::ptr_eq(&resolution, &cached));
	assert_eq!(resolver.resolutions(), 1);
}
