use rustc_hash::FxHashMap as HashMap;

use crate::{DispatchError, DispatchHost, EntryPoint, OpKey, Result, Signature};


/// How a replacement is spliced into a type's dispatch table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Strategy {
	/// Swap the original and replacement slots. Both stay callable: the
	/// replacement identifier now reaches the original behavior.
	#[default]
	Exchange,
	/// Overwrite the original slot. The replacement identifier is not
	/// tracked and does not forward anywhere.
	Replace,
	/// Run custom code before the original. Not implemented.
	Before,
	/// Run custom code after the original. Not implemented.
	After,
	/// Wrap the original. Not implemented.
	Around,
}

impl Strategy {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Exchange => "exchange",
			Self::Replace => "replace",
			Self::Before => "before",
			Self::After => "after",
			Self::Around => "around",
		}
	}

	/// Returns true for strategies this core can execute.
	pub const fn is_supported(self) -> bool {
		matches!(self, Self::Exchange | Self::Replace)
	}
}

/// One captured (and possibly rewired) operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationRewire {
	key: OpKey,
	original: EntryPoint,
	replacement: Option<EntryPoint>,
	replacement_operation: Option<Box<str>>,
	strategy: Strategy,
	installed: bool,
}

impl OperationRewire {
	pub fn class(&self) -> &str {
		&self.key.class
	}

	pub fn operation(&self) -> &str {
		&self.key.operation
	}

	pub fn key(&self) -> &OpKey {
		&self.key
	}

	/// Entry point captured before any rewiring. Never changes.
	pub fn original(&self) -> EntryPoint {
		self.original
	}

	pub fn replacement(&self) -> Option<EntryPoint> {
		self.replacement
	}

	/// Identifier the replacement was registered under, for exchanged rewires.
	pub fn replacement_operation(&self) -> Option<&str> {
		self.replacement_operation.as_deref()
	}

	pub fn strategy(&self) -> Strategy {
		self.strategy
	}

	pub fn is_installed(&self) -> bool {
		self.installed
	}
}

/// Everything needed to intercept one operation in a single call.
#[derive(Debug, Clone)]
pub struct Rewire<'a> {
	pub class: &'a str,
	pub operation: &'a str,
	/// Identifier the replacement is registered under.
	pub replacement_operation: &'a str,
	pub entry: EntryPoint,
	pub signature: &'a Signature,
	pub strategy: Strategy,
}

/// Owner of the original-entry-point registry.
///
/// Holds one [`OperationRewire`] per captured operation. The registry is the
/// only way back to pre-rewire behavior, so it must outlive every rewire it
/// records.
#[derive(Debug, Default)]
pub struct Interceptor {
	rewires: HashMap<OpKey, OperationRewire>,
	order: Vec<OpKey>,
}

impl Interceptor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Captures the current entry point of `operation` on `class`.
	///
	/// The first capture wins. Later calls return the stored entry point even
	/// if the live slot has since been rewired.
	pub fn capture<H: DispatchHost + ?Sized>(&mut self, host: &H, class: &str, operation: &str) -> Result<EntryPoint> {
		let key = OpKey::new(class, operation);
		if let Some(existing) = self.rewires.get(&key) {
			return Ok(existing.original);
		}

		if !host.contains_type(class) {
			tracing::warn!(domain = "dispatch", class, operation, "capture failed: type not found");
			return Err(DispatchError::TypeNotFound { class: class.into() });
		}

		let Some(original) = host.implementation(class, operation) else {
			tracing::warn!(domain = "dispatch", class, operation, "capture failed: operation not found");
			return Err(DispatchError::OperationNotFound {
				class: class.into(),
				operation: operation.into(),
			});
		};

		tracing::trace!(domain = "dispatch", class, operation, %original, "captured original");
		self.order.push(key.clone());
		self.rewires.insert(
			key.clone(),
			OperationRewire {
				key,
				original,
				replacement: None,
				replacement_operation: None,
				strategy: Strategy::default(),
				installed: false,
			},
		);
		Ok(original)
	}

	/// Adds `entry` to `class` under a fresh operation identifier.
	///
	/// An existing operation with the same identifier is reported as
	/// [`DispatchError::AlreadyExists`] and logged as a warning: repeated
	/// installation attempts hit this path routinely.
	pub fn register_replacement<H: DispatchHost + ?Sized>(
		&self,
		host: &mut H,
		class: &str,
		operation: &str,
		entry: EntryPoint,
		signature: &Signature,
	) -> Result<()> {
		if !host.contains_type(class) {
			tracing::warn!(domain = "dispatch", class, operation, "register failed: type not found");
			return Err(DispatchError::TypeNotFound { class: class.into() });
		}

		if !host.add_operation(class, operation, entry, signature) {
			tracing::warn!(domain = "dispatch", class, operation, "replacement already registered");
			return Err(DispatchError::AlreadyExists {
				class: class.into(),
				operation: operation.into(),
			});
		}

		tracing::trace!(domain = "dispatch", class, operation, %entry, %signature, "registered replacement");
		Ok(())
	}

	/// Points `original_operation` at the code bound to `replacement_operation`.
	///
	/// Requires a prior [`capture`](Self::capture) of `original_operation`.
	/// Rewiring an already rewired operation is a successful no-op.
	pub fn rewire<H: DispatchHost + ?Sized>(
		&mut self,
		host: &mut H,
		class: &str,
		original_operation: &str,
		replacement_operation: &str,
		strategy: Strategy,
	) -> Result<()> {
		if !strategy.is_supported() {
			tracing::error!(
				domain = "dispatch",
				class,
				operation = original_operation,
				strategy = strategy.as_str(),
				"rewiring strategy not implemented",
			);
			return Err(DispatchError::NotImplemented(strategy));
		}

		let key = OpKey::new(class, original_operation);
		let Some(record) = self.rewires.get_mut(&key) else {
			tracing::error!(
				domain = "dispatch",
				class,
				operation = original_operation,
				"rewire requested before capture",
			);
			return Err(DispatchError::NotCaptured {
				class: class.into(),
				operation: original_operation.into(),
			});
		};

		if record.installed {
			tracing::debug!(domain = "dispatch", class, operation = original_operation, "already rewired");
			return Ok(());
		}

		let Some(replacement) = host.implementation(class, replacement_operation) else {
			tracing::warn!(
				domain = "dispatch",
				class,
				operation = replacement_operation,
				"rewire failed: replacement not found",
			);
			return Err(DispatchError::OperationNotFound {
				class: class.into(),
				operation: replacement_operation.into(),
			});
		};

		match strategy {
			Strategy::Exchange => {
				if !host.exchange(class, original_operation, replacement_operation) {
					tracing::warn!(domain = "dispatch", class, operation = original_operation, "exchange rejected");
					return Err(DispatchError::HostRejected {
						action: "exchange",
						class: class.into(),
						operation: original_operation.into(),
					});
				}
				record.replacement_operation = Some(replacement_operation.into());
			}
			Strategy::Replace => {
				if host.set_implementation(class, original_operation, replacement).is_none() {
					tracing::warn!(domain = "dispatch", class, operation = original_operation, "replace rejected");
					return Err(DispatchError::HostRejected {
						action: "replace",
						class: class.into(),
						operation: original_operation.into(),
					});
				}
				record.replacement_operation = None;
			}
			other => return Err(DispatchError::NotImplemented(other)),
		}

		record.replacement = Some(replacement);
		record.strategy = strategy;
		record.installed = true;
		tracing::debug!(
			domain = "dispatch",
			class,
			operation = original_operation,
			strategy = strategy.as_str(),
			"rewired",
		);
		Ok(())
	}

	/// Captures, registers and rewires in the only safe order.
	///
	/// A replacement that is already registered is tolerated: the warning is
	/// logged, the registration is rebound to `request.entry` and rewiring
	/// proceeds.
	pub fn intercept<H: DispatchHost + ?Sized>(&mut self, host: &mut H, request: &Rewire<'_>) -> Result<()> {
		if self.is_rewired(request.class, request.operation) {
			tracing::debug!(domain = "dispatch", class = request.class, operation = request.operation, "already intercepted");
			return Ok(());
		}
		if !request.strategy.is_supported() {
			tracing::error!(
				domain = "dispatch",
				class = request.class,
				operation = request.operation,
				strategy = request.strategy.as_str(),
				"rewiring strategy not implemented",
			);
			return Err(DispatchError::NotImplemented(request.strategy));
		}

		self.capture(&*host, request.class, request.operation)?;

		match self.register_replacement(host, request.class, request.replacement_operation, request.entry, request.signature) {
			Ok(()) => {}
			Err(DispatchError::AlreadyExists { .. }) => {
				// A registration left behind by an earlier install may carry a
				// stale entry point; the rewire must pick up `request.entry`.
				if host.implementation(request.class, request.replacement_operation) != Some(request.entry) {
					host.set_implementation(request.class, request.replacement_operation, request.entry);
				}
			}
			Err(err) => return Err(err),
		}

		self.rewire(host, request.class, request.operation, request.replacement_operation, request.strategy)
	}

	/// Rebinds the captured original of `operation` on `class`.
	///
	/// Restoring an operation that was never rewired is a no-op. The record
	/// is dropped afterwards; a later install captures afresh.
	pub fn restore<H: DispatchHost + ?Sized>(&mut self, host: &mut H, class: &str, operation: &str) -> Result<()> {
		let key = OpKey::new(class, operation);
		let Some(record) = self.rewires.get(&key) else {
			tracing::trace!(domain = "dispatch", class, operation, "restore: nothing captured");
			return Ok(());
		};

		if record.installed {
			if host.set_implementation(class, operation, record.original).is_none() {
				tracing::warn!(domain = "dispatch", class, operation, "restore rejected");
				return Err(DispatchError::HostRejected {
					action: "restore",
					class: class.into(),
					operation: operation.into(),
				});
			}
			if let (Some(replacement_operation), Some(replacement)) =
				(record.replacement_operation.as_deref(), record.replacement)
			{
				host.set_implementation(class, replacement_operation, replacement);
			}
			tracing::debug!(domain = "dispatch", class, operation, "restored");
		}

		self.rewires.remove(&key);
		self.order.retain(|k| *k != key);
		Ok(())
	}

	/// Restores every recorded operation, newest first.
	///
	/// Keeps going after a failure and returns the first error seen. The
	/// registry is empty afterwards.
	pub fn restore_all<H: DispatchHost + ?Sized>(&mut self, host: &mut H) -> Result<()> {
		let mut first_error = None;
		let keys: Vec<OpKey> = self.order.iter().rev().cloned().collect();
		for key in keys {
			if let Err(err) = self.restore(host, &key.class, &key.operation) {
				first_error.get_or_insert(err);
			}
		}
		self.rewires.clear();
		self.order.clear();
		first_error.map_or(Ok(()), Err)
	}

	/// Captured original for forwarding from a replacement.
	pub fn original(&self, class: &str, operation: &str) -> Option<EntryPoint> {
		self.rewires.get(&OpKey::new(class, operation)).map(|r| r.original)
	}

	pub fn is_rewired(&self, class: &str, operation: &str) -> bool {
		self.rewires
			.get(&OpKey::new(class, operation))
			.is_some_and(|r| r.installed)
	}

	pub fn get(&self, class: &str, operation: &str) -> Option<&OperationRewire> {
		self.rewires.get(&OpKey::new(class, operation))
	}

	/// Installed rewires in installation order.
	pub fn rewired(&self) -> impl Iterator<Item = &OperationRewire> {
		self.order
			.iter()
			.filter_map(|key| self.rewires.get(key))
			.filter(|r| r.installed)
	}

	/// Number of captured operations, rewired or not.
	pub fn len(&self) -> usize {
		self.rewires.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rewires.is_empty()
	}
}
