//! Bridge configuration.
//!
//! Loaded from TOML; every key is optional:
//!
//! ```toml
//! missing_callback = "advise"   # or "reject"
//! first_handle = 1
//! trace_dispatch = false
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// Error parsing TOML syntax or an unknown key.
	#[error("TOML parse error: {0}")]
	Toml(#[from] toml::de::Error),

	/// `first_handle` was zero, the null handle.
	#[error("first_handle must be at least 1")]
	NullFirstHandle,
}

/// What resolution does when a type claims a capability but registers no callback for it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingCallbackPolicy {
	/// Log a warning and resolve the capability as Absent.
	#[default]
	Advise,
	/// Fail resolution for the type.
	Reject,
}

/// Settings shared by the registry, resolver, and adapters of one bridge.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
	pub missing_callback: MissingCallbackPolicy,
	/// First raw handle value the registry issues.
	pub first_handle: u64,
	/// Emit a trace event for every adapter dispatch.
	pub trace_dispatch: bool,
}

impl Default for BridgeConfig {
	fn default() -> Self {
		Self {
			missing_callback: MissingCallbackPolicy::Advise,
			first_handle: 1,
			trace_dispatch: false,
		}
	}
}

impl BridgeConfig {
	/// Parses and validates a TOML document.
	pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(input)?;
		config.validate()?;
		Ok(config)
	}

	/// Reads and parses a TOML file.
	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let input = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
			path: path.to_path_buf(),
			error,
		})?;
		Self::from_toml_str(&input)
	}

	pub fn with_missing_callback(mut self, policy: MissingCallbackPolicy) -> Self {
		self.missing_callback = policy;
		self
	}

	pub fn with_trace_dispatch(mut self, enabled: bool) -> Self {
		self.trace_dispatch = enabled;
		self
	}

	fn validate(&self) -> Result<(), ConfigError> {
		if self.first_handle == 0 {
			return Err(ConfigError::NullFirstHandle);
		}
		Ok(())
	}
}
