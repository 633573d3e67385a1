//! Conversion of host-provided buffer lists into borrowed views.
//!
//! Nothing is copied: each view borrows the host's array for the duration of one call.

use std::slice;

use conduit_registry::{Buffers, BuffersMut, PartialsMut};

use crate::error::FfiError;
use crate::types::{ConduitBuffer, ConduitBufferList, ConduitPartialsBuffer, ConduitPartialsList, ConduitStr};

/// # Safety
///
/// `s.ptr` must point to `s.len` readable bytes that outlive `'a`, or be null with `len == 0`.
pub(crate) unsafe fn str_arg<'a>(s: ConduitStr, what: &'static str) -> Result<&'a str, FfiError> {
	if s.ptr.is_null() {
		return if s.len == 0 { Ok("") } else { Err(FfiError::Null(what)) };
	}
	let bytes = unsafe { slice::from_raw_parts(s.ptr, s.len) };
	std::str::from_utf8(bytes).map_err(|_| FfiError::InvalidArgument(format!("{what} is not valid UTF-8")))
}

/// # Safety
///
/// Same contract as [`str_arg`], for `len` `f64`s.
unsafe fn data_arg<'a>(data: *mut f64, len: usize, name: &str) -> Result<&'a mut [f64], FfiError> {
	if data.is_null() {
		return if len == 0 {
			Ok(&mut [])
		} else {
			Err(FfiError::InvalidArgument(format!("buffer '{name}' has null data")))
		};
	}
	Ok(unsafe { slice::from_raw_parts_mut(data, len) })
}

/// # Safety
///
/// `ptr` must point to `len` valid items that outlive `'a`, or be null with `len == 0`.
unsafe fn list_arg<'a, T>(ptr: *const T, len: usize, what: &'static str) -> Result<&'a [T], FfiError> {
	if ptr.is_null() {
		return if len == 0 { Ok(&[]) } else { Err(FfiError::Null(what)) };
	}
	Ok(unsafe { slice::from_raw_parts(ptr, len) })
}

/// # Safety
///
/// Every entry must satisfy [`str_arg`] and [`data_arg`] for `'a`.
pub(crate) unsafe fn read_views<'a>(list: ConduitBufferList, what: &'static str) -> Result<Buffers<'a>, FfiError> {
	let entries: &'a [ConduitBuffer] = unsafe { list_arg(list.ptr, list.len, what)? };
	let mut views = Buffers::new();
	for entry in entries {
		let name = unsafe { str_arg(entry.name, what)? };
		let data = unsafe { data_arg(entry.data, entry.len, name)? };
		views.insert(name, data);
	}
	Ok(views)
}

/// # Safety
///
/// As [`read_views`]; additionally no two entries, in this list or any other list of the
/// same call, may overlap.
pub(crate) unsafe fn write_views<'a>(list: ConduitBufferList, what: &'static str) -> Result<BuffersMut<'a>, FfiError> {
	let entries: &'a [ConduitBuffer] = unsafe { list_arg(list.ptr, list.len, what)? };
	let mut views = BuffersMut::new();
	for entry in entries {
		let name = unsafe { str_arg(entry.name, what)? };
		let data = unsafe { data_arg(entry.data, entry.len, name)? };
		views.insert(name, data);
	}
	Ok(views)
}

/// # Safety
///
/// As [`write_views`].
pub(crate) unsafe fn partials_views<'a>(list: ConduitPartialsList, what: &'static str) -> Result<PartialsMut<'a>, FfiError> {
	let entries: &'a [ConduitPartialsBuffer] = unsafe { list_arg(list.ptr, list.len, what)? };
	let mut views = PartialsMut::new();
	for entry in entries {
		let of = unsafe { str_arg(entry.of, what)? };
		let wrt = unsafe { str_arg(entry.wrt, what)? };
		let data = unsafe { data_arg(entry.data, entry.len, of)? };
		views.insert(of, wrt, data);
	}
	Ok(views)
}
