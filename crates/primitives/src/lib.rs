//! Value types shared by both sides of the component boundary: handles, descriptors, and
//! borrowed buffer views.

/// Borrowed buffer views and host-side buffer storage.
pub mod buffer;
/// Variable and partials descriptor records.
pub mod descriptor;
/// Opaque component handles.
pub mod handle;
/// The `setup` result and its validation.
pub mod setup;

pub use buffer::{BufferError, BufferStore, Buffers, BuffersMut, LinearMode, PartialsKey, PartialsMut, PartialsStore};
pub use descriptor::{PartialsDescriptor, PartialsMethod, VariableDescriptor};
pub use handle::ComponentHandle;
pub use setup::{ComponentSetup, SetupError};

#[cfg(test)]
mod tests;
