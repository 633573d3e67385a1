use pretty_assertions::assert_eq;
use proptest::prelude::*;

use crate::{
	BufferError, BufferStore, Buffers, BuffersMut, ComponentHandle, ComponentSetup, LinearMode,
	PartialsDescriptor, PartialsMethod, PartialsMut, PartialsStore, SetupError, VariableDescriptor,
};

fn paraboloid() -> ComponentSetup {
	ComponentSetup::default()
		.with_input(VariableDescriptor::new("x").with_value([3.0]))
		.with_input(VariableDescriptor::new("y").with_shape([2]).with_value([1.0, 2.0]))
		.with_output(VariableDescriptor::new("f").with_units("m**2"))
		.with_partials(PartialsDescriptor::new("f", "x"))
		.with_partials(PartialsDescriptor::new("f", "y").with_sparsity([0, 0], [0, 1]))
}

#[test]
fn test_null_handle_is_never_a_valid_raw_value() {
	assert!(ComponentHandle::NULL.is_null());
	assert!(!ComponentHandle::from_raw(1).is_null());
	assert_eq!(ComponentHandle::from_raw(42).as_raw(), 42);
	assert_eq!(ComponentHandle::from_raw(7).to_string(), "#7");
}

#[test]
fn test_variable_defaults_broadcast_over_shape() {
	let var = VariableDescriptor::new("v").with_shape([2, 3]).with_value([0.5]);
	assert_eq!(var.size(), 6);
	assert_eq!(var.default_array(), vec![0.5; 6]);

	let scalar = VariableDescriptor::new("s");
	assert_eq!(scalar.value(), &[1.0]);
	assert_eq!(scalar.shape(), &[1]);
	assert_eq!(scalar.units(), None);
}

#[test]
fn test_variable_wire_shape_defaults_optional_fields() {
	let var: VariableDescriptor = serde_json::from_str(r#"{"name": "x"}"#).unwrap();
	assert_eq!(var, VariableDescriptor::new("x"));

	let json = serde_json::to_value(VariableDescriptor::new("y").with_units("kg")).unwrap();
	assert_eq!(
		json,
		serde_json::json!({"name": "y", "value": [1.0], "shape": [1], "units": "kg"})
	);
}

#[test]
fn test_partials_wire_shape() {
	let json = serde_json::json!({
		"of": "f",
		"wrt": "y",
		"rows": [0, 0],
		"cols": [0, 1],
		"method": "cs",
	});
	let partial: PartialsDescriptor = serde_json::from_value(json).unwrap();
	assert_eq!(partial.rows(), Some(&[0, 0][..]));
	assert_eq!(partial.cols(), Some(&[0, 1][..]));
	assert_eq!(partial.value(), None);
	assert_eq!(partial.method(), PartialsMethod::Cs);
	assert!(partial.is_sparse());
}

#[test]
fn test_valid_setup_passes() {
	assert_eq!(paraboloid().validate(), Ok(()));
}

#[test]
fn test_duplicate_input_rejected() {
	let setup = ComponentSetup::default()
		.with_input(VariableDescriptor::new("x"))
		.with_input(VariableDescriptor::new("x"));
	assert_eq!(
		setup.validate(),
		Err(SetupError::DuplicateVariable {
			role: "input",
			name: "x".into()
		})
	);
}

#[test]
fn test_same_name_in_inputs_and_outputs_is_allowed() {
	let setup = ComponentSetup::default()
		.with_input(VariableDescriptor::new("x"))
		.with_output(VariableDescriptor::new("x"));
	assert_eq!(setup.validate(), Ok(()));
}

#[test]
fn test_default_length_must_match_shape() {
	let setup = ComponentSetup::default().with_output(VariableDescriptor::new("y").with_shape([3]).with_value([1.0, 2.0]));
	assert!(matches!(setup.validate(), Err(SetupError::DefaultLength { actual: 2, .. })));
}

#[test]
fn test_partials_must_reference_declared_variables() {
	let unknown_of = paraboloid().with_partials(PartialsDescriptor::new("g", "x"));
	assert!(matches!(unknown_of.validate(), Err(SetupError::UnknownOf { .. })));

	let input_as_of = paraboloid().with_partials(PartialsDescriptor::new("x", "y"));
	assert!(matches!(input_as_of.validate(), Err(SetupError::UnknownOf { .. })));

	let unknown_wrt = paraboloid().with_partials(PartialsDescriptor::new("f", "z"));
	assert!(matches!(unknown_wrt.validate(), Err(SetupError::UnknownWrt { .. })));

	let pattern = paraboloid().with_partials(PartialsDescriptor::new("*", "*").with_method(PartialsMethod::Fd));
	assert_eq!(pattern.validate(), Ok(()));
}

#[test]
fn test_sparsity_checks() {
	let unequal = paraboloid().with_partials(PartialsDescriptor::new("f", "x").with_sparsity([0, 0], [0]));
	assert!(matches!(
		unequal.validate(),
		Err(SetupError::SparsityLength { rows: 2, cols: 1, .. })
	));

	let json = serde_json::json!({"of": "f", "wrt": "x", "rows": [0]});
	let unpaired: PartialsDescriptor = serde_json::from_value(json).unwrap();
	let setup = paraboloid().with_partials(unpaired);
	assert!(matches!(setup.validate(), Err(SetupError::UnpairedSparsity { .. })));

	let bad_value = paraboloid().with_partials(
		PartialsDescriptor::new("f", "y")
			.with_sparsity([0, 0], [0, 1])
			.with_value([1.0, 2.0, 3.0]),
	);
	assert!(matches!(
		bad_value.validate(),
		Err(SetupError::ValueLength {
			expected: 2,
			actual: 3,
			..
		})
	));

	let broadcast = paraboloid().with_partials(PartialsDescriptor::new("f", "y").with_value([2.0]));
	assert_eq!(broadcast.validate(), Ok(()));
}

#[test]
fn test_buffers_preserve_insertion_order_and_replace_in_place() {
	let a = [1.0];
	let b = [2.0];
	let c = [3.0];
	let mut views = Buffers::new().with("b", &b).with("a", &a);
	assert_eq!(views.insert("b", &c), Some(&b[..]));
	assert_eq!(views.names().collect::<Vec<_>>(), vec!["b", "a"]);
	assert_eq!(views.get("b"), Some(&[3.0][..]));
	assert_eq!(views.require("zz"), Err(BufferError::Missing("zz".into())));
}

#[test]
fn test_writes_through_views_land_in_host_storage() {
	let mut y = vec![0.0, 0.0];
	{
		let mut outputs = BuffersMut::new().with("y", &mut y);
		let view = outputs.require_mut("y").unwrap();
		view[0] = 4.0;
		view[1] = 5.0;
		assert_eq!(outputs.as_read().get("y"), Some(&[4.0, 5.0][..]));
	}
	assert_eq!(y, vec![4.0, 5.0]);
}

#[test]
fn test_partials_lookup_by_pair() {
	let mut dfdx = vec![0.0];
	let mut dfdy = vec![0.0, 0.0];
	let mut partials = PartialsMut::new().with("f", "x", &mut dfdx).with("f", "y", &mut dfdy);

	let of = String::from("f");
	let wrt = String::from("y");
	partials.require_mut(&of, &wrt).unwrap()[1] = 9.0;
	assert!(partials.get("y", "f").is_none());
	assert_eq!(
		partials.require_mut("g", "x"),
		Err(BufferError::MissingPartials {
			of: "g".into(),
			wrt: "x".into()
		})
	);
	drop(partials);
	assert_eq!(dfdy, vec![0.0, 9.0]);
}

#[test]
fn test_stores_allocate_from_setup() {
	let setup = paraboloid();
	let inputs = BufferStore::inputs_of(&setup);
	assert_eq!(inputs.get("x"), Some(&[3.0][..]));
	assert_eq!(inputs.get("y"), Some(&[1.0, 2.0][..]));

	let residuals = BufferStore::residuals_of(&setup);
	assert_eq!(residuals.get("f"), Some(&[0.0][..]));

	let partials = PartialsStore::of_setup(&setup);
	assert_eq!(partials.get("f", "x").map(<[f64]>::len), Some(1));
	assert_eq!(partials.get("f", "y").map(<[f64]>::len), Some(2));
}

#[test]
fn test_linear_mode_strings() {
	assert_eq!("fwd".parse::<LinearMode>(), Ok(LinearMode::Fwd));
	assert_eq!(LinearMode::Rev.as_str(), "rev");
	assert!("sideways".parse::<LinearMode>().is_err());
}

proptest! {
	#[test]
	fn prop_store_views_round_trip_every_array(values in prop::collection::vec(prop::collection::vec(-1e6f64..1e6, 0..8), 0..8)) {
		let mut store = BufferStore::new();
		for (i, data) in values.iter().enumerate() {
			store.set(format!("v{i}"), data.clone());
		}
		let view = store.view();
		prop_assert_eq!(view.len(), values.len());
		for (i, data) in values.iter().enumerate() {
			prop_assert_eq!(view.get(&format!("v{i}")), Some(data.as_slice()));
		}
	}
}
