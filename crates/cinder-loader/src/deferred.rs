// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Deferred values and synchronous settlement inspection
//!
//! A [`DeferredValue`] is the promise-shaped result handed back by the
//! fetch, parse and link-and-evaluate collaborators. The loader never
//! awaits one; it only looks at the slot through [`DeferredValue::inspect`]
//! and turns anything unsettled into a hard error via [`force_settle`].

use crate::error::{LoaderError, Result};
use parking_lot::Mutex;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Reason a deferred value was rejected
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    /// The thrown value
    pub value: Value,
    /// Human-readable message, when the thrown value carried one
    pub message: Option<String>,
}

impl Rejection {
    /// Rejection carrying only a thrown value
    pub fn new(value: Value) -> Self {
        Self { value, message: None }
    }

    /// Rejection with an explicit message
    pub fn with_message(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            value: Value::String(message.clone()),
            message: Some(message),
        }
    }

    /// Capture an error's display text as the rejection message
    pub fn from_error<E: std::error::Error>(err: &E) -> Self {
        Self::with_message(err.to_string())
    }

    /// Message for a failure while loading `key`
    ///
    /// Falls back to `<value> occurred while parsing module "<key>"` when the
    /// reason has no message of its own.
    pub fn describe(&self, key: &str) -> String {
        match &self.message {
            Some(msg) if !msg.is_empty() => msg.clone(),
            _ => {
                let shown = match &self.value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                format!("{} occurred while parsing module \"{}\"", shown, key)
            }
        }
    }
}

/// Observable settlement of a deferred value
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement<T> {
    /// Not settled yet, or forwarded to another deferred value
    Pending,
    /// Settled successfully
    Fulfilled(T),
    /// Settled with a failure
    Rejected(Rejection),
}

impl<T> Settlement<T> {
    /// Check if the settlement is still pending
    pub fn is_pending(&self) -> bool {
        matches!(self, Settlement::Pending)
    }
}

enum Slot<T> {
    Pending,
    Fulfilled(T),
    Rejected(Rejection),
    Forwarded(DeferredValue<T>),
}

/// Shared, promise-shaped container for a result that may not be known yet
pub struct DeferredValue<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for DeferredValue<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T> DeferredValue<T> {
    /// Create an unsettled value and the resolver that settles it
    pub fn pending() -> (Self, Resolver<T>) {
        let value = Self {
            slot: Arc::new(Mutex::new(Slot::Pending)),
        };
        let resolver = Resolver {
            target: value.clone(),
        };
        (value, resolver)
    }

    /// Create an already-fulfilled value
    pub fn fulfilled(value: T) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Fulfilled(value))),
        }
    }

    /// Create an already-rejected value
    pub fn rejected(reason: Rejection) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Rejected(reason))),
        }
    }

    /// Create a value that settled to another deferred value
    pub fn forwarded(other: DeferredValue<T>) -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot::Forwarded(other))),
        }
    }

    /// Whether both handles share one slot
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl<T: Clone> DeferredValue<T> {
    /// Look at the settlement without scheduling anything
    ///
    /// A value forwarded to another deferred value reports `Pending`
    /// whatever the state of the target: something upstream is still
    /// genuinely deferred.
    pub fn inspect(&self) -> Settlement<T> {
        match &*self.slot.lock() {
            Slot::Pending | Slot::Forwarded(_) => Settlement::Pending,
            Slot::Fulfilled(value) => Settlement::Fulfilled(value.clone()),
            Slot::Rejected(reason) => Settlement::Rejected(reason.clone()),
        }
    }
}

impl<T> fmt::Debug for DeferredValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.lock() {
            Slot::Pending => "pending",
            Slot::Fulfilled(_) => "fulfilled",
            Slot::Rejected(_) => "rejected",
            Slot::Forwarded(_) => "forwarded",
        };
        f.debug_struct("DeferredValue").field("state", &state).finish()
    }
}

/// Settles a pending [`DeferredValue`] exactly once
pub struct Resolver<T> {
    target: DeferredValue<T>,
}

impl<T> Resolver<T> {
    fn settle(&self, next: Slot<T>) -> bool {
        let mut slot = self.target.slot.lock();
        if !matches!(*slot, Slot::Pending) {
            tracing::debug!("Ignoring second settlement of a deferred value");
            return false;
        }
        *slot = next;
        true
    }

    /// Fulfill with a value
    pub fn fulfill(&self, value: T) -> bool {
        self.settle(Slot::Fulfilled(value))
    }

    /// Reject with a reason
    pub fn reject(&self, reason: Rejection) -> bool {
        self.settle(Slot::Rejected(reason))
    }

    /// Settle to another deferred value
    pub fn forward(&self, other: DeferredValue<T>) -> bool {
        self.settle(Slot::Forwarded(other))
    }
}

/// Synchronously unwrap `deferred`, which belongs to the module `key`
///
/// `what` names the step for logging (`"fetch"`, `"parse"`, ...).
pub fn force_settle<T: Clone>(key: &str, what: &str, deferred: &DeferredValue<T>) -> Result<T> {
    match deferred.inspect() {
        Settlement::Fulfilled(value) => {
            tracing::trace!("{} of {} settled", what, key);
            Ok(value)
        }
        Settlement::Rejected(reason) => {
            tracing::trace!("{} of {} rejected", what, key);
            Err(LoaderError::ParseOrFetchFailed {
                key: key.to_string(),
                reason: reason.describe(key),
            })
        }
        Settlement::Pending => {
            tracing::trace!("{} of {} still pending", what, key);
            Err(LoaderError::async_unsupported(key))
        }
    }
}
