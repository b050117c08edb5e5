//! Objective-C runtime host.
//!
//! Routes [`DispatchHost`] calls to `libobjc`. Instance-method lookup in the
//! runtime already walks the superclass chain, so the inherited-slot rules of
//! the trait hold without extra bookkeeping here.

use std::ffi::{CString, c_char, c_void};

use crate::{DispatchHost, EntryPoint, Signature};

type Class = *mut c_void;
type Sel = *const c_void;
type Method = *mut c_void;
type Imp = *const c_void;

#[link(name = "objc")]
unsafe extern "C" {
	fn objc_getClass(name: *const c_char) -> Class;
	fn sel_registerName(name: *const c_char) -> Sel;
	fn class_getInstanceMethod(cls: Class, name: Sel) -> Method;
	fn class_addMethod(cls: Class, name: Sel, imp: Imp, types: *const c_char) -> i8;
	fn method_getImplementation(method: Method) -> Imp;
	fn method_setImplementation(method: Method, imp: Imp) -> Imp;
	fn method_exchangeImplementations(first: Method, second: Method);
}

/// Process-wide Objective-C runtime.
///
/// Stateless: every call goes straight to the runtime. Must only be driven
/// from the main thread while the toolkit may dispatch concurrently.
#[derive(Debug, Default, Clone, Copy)]
pub struct ObjcRuntime;

impl ObjcRuntime {
	pub const fn new() -> Self {
		Self
	}

	fn class(&self, name: &str) -> Option<Class> {
		let name = CString::new(name).ok()?;
		// SAFETY: `name` is a valid NUL-terminated string for the call.
		let cls = unsafe { objc_getClass(name.as_ptr()) };
		(!cls.is_null()).then_some(cls)
	}

	fn selector(&self, name: &str) -> Option<Sel> {
		let name = CString::new(name).ok()?;
		// SAFETY: selectors are interned by the runtime and live forever.
		let sel = unsafe { sel_registerName(name.as_ptr()) };
		(!sel.is_null()).then_some(sel)
	}

	fn method(&self, class: &str, operation: &str) -> Option<Method> {
		let cls = self.class(class)?;
		let sel = self.selector(operation)?;
		// SAFETY: `cls` and `sel` were returned non-null by the runtime.
		let method = unsafe { class_getInstanceMethod(cls, sel) };
		(!method.is_null()).then_some(method)
	}
}

impl DispatchHost for ObjcRuntime {
	fn contains_type(&self, class: &str) -> bool {
		self.class(class).is_some()
	}

	fn implementation(&self, class: &str, operation: &str) -> Option<EntryPoint> {
		let method = self.method(class, operation)?;
		// SAFETY: `method` is a live runtime method handle.
		EntryPoint::from_ptr(unsafe { method_getImplementation(method) })
	}

	fn add_operation(&mut self, class: &str, operation: &str, entry: EntryPoint, signature: &Signature) -> bool {
		let (Some(cls), Some(sel)) = (self.class(class), self.selector(operation)) else {
			return false;
		};
		let Ok(types) = CString::new(signature.as_str()) else {
			return false;
		};
		// SAFETY: `entry` is the address of an `extern "C"` function whose
		// layout matches `types`; the runtime copies the encoding string.
		unsafe { class_addMethod(cls, sel, entry.as_ptr(), types.as_ptr()) != 0 }
	}

	fn set_implementation(&mut self, class: &str, operation: &str, entry: EntryPoint) -> Option<EntryPoint> {
		let method = self.method(class, operation)?;
		// SAFETY: see `add_operation`; `method` is a live runtime handle.
		EntryPoint::from_ptr(unsafe { method_setImplementation(method, entry.as_ptr()) })
	}

	fn exchange(&mut self, class: &str, first: &str, second: &str) -> bool {
		let (Some(a), Some(b)) = (self.method(class, first), self.method(class, second)) else {
			return false;
		};
		// SAFETY: both handles are live and belong to the same class chain.
		unsafe { method_exchangeImplementations(a, b) };
		true
	}
}
