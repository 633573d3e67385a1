//! Component registry and capability dispatch for cross-runtime component boundaries.
//!
//! A host framework drives components that live on this side of a boundary. It never holds
//! them directly: it holds [`ComponentHandle`]s issued by a [`ComponentRegistry`], asks a
//! [`CapabilityResolver`] once per component type which callbacks exist, and calls the
//! resulting adapters with live numeric buffers on every step.
//!
//! # Layout
//!
//! - [`capability`] - The fixed callback protocol and capability sets
//! - [`component`] - One trait per callback, plus [`ComponentType`] declarations
//! - [`registry`] - Handle-to-instance map
//! - [`resolver`] - Per-type capability verdicts and dispatch tables
//! - [`adapter`] - Stable-signature entry points for Present capabilities
//! - [`bridge`] - Facade bundling the above behind one [`BridgeConfig`]
//!
//! # Example
//!
//! ```rust,ignore
//! let bridge = Bridge::default();
//! let handle = bridge.create(Adder)?;
//! let setup = bridge.setup(handle)?;
//!
//! let mut inputs = BufferStore::inputs_of(&setup);
//! let mut outputs = BufferStore::outputs_of(&setup);
//! bridge.compute(handle, &inputs.view(), &mut outputs.view_mut())?;
//! ```

pub mod adapter;
pub mod bridge;
pub mod capability;
pub mod component;
pub mod config;
pub mod error;
pub mod registry;
pub mod resolver;
pub mod table;

#[cfg(any(test, doc))]
pub(crate) mod invariants;

#[cfg(any(test, doc))]
pub(crate) mod test_fixtures;

pub use adapter::{
	Adapter, AdapterFactory, AdapterLookup, ApplyLinearAdapter, ApplyNonlinearAdapter, ComputeAdapter,
	ComputePartialsAdapter, GuessNonlinearAdapter, LinearizeAdapter, SetupAdapter, SolveNonlinearAdapter,
};
pub use bridge::Bridge;
pub use capability::{Capability, CapabilitySet, ComponentKind, UnknownCapability};
pub use component::{
	ApplyLinear, ApplyNonlinear, ComponentType, Compute, ComputePartials, GuessNonlinear, Linearize, Setup,
	SolveNonlinear,
};
pub use conduit_primitives::{
	BufferError, BufferStore, Buffers, BuffersMut, ComponentHandle, ComponentSetup, LinearMode, PartialsDescriptor,
	PartialsKey, PartialsMethod, PartialsMut, PartialsStore, SetupError, VariableDescriptor,
};
pub use config::{BridgeConfig, ConfigError, MissingCallbackPolicy};
pub use error::{BridgeError, CallbackError, CallbackResult, Result};
pub use registry::{ComponentRef, ComponentRegistry};
pub use resolver::{CapabilityResolver, Resolution, Verdict};
pub use table::{CallbackTable, CallbackTableBuilder};
