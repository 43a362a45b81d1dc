//! Nested local operations.
//!
//! Every delegate call made by a local (embedded) mount runs inside a
//! [`NestedOperation`]: the remote→local path map is pushed onto the
//! request scope and a nested transaction is opened; both are popped when
//! the guard drops, whichever way the call exits. Remote mounts carry no
//! transaction scope and the guard does nothing.

use std::sync::Arc;

use regmount_core::{PathMap, RequestScope, TransactionScope};

/// RAII guard around one delegate call.
#[must_use = "the nested operation closes as soon as the guard is dropped"]
pub struct NestedOperation<'s> {
    scope: &'s RequestScope,
    transactions: Option<Arc<dyn TransactionScope>>,
}

impl<'s> NestedOperation<'s> {
    /// Open a nested operation. With `transactions == None` (remote mounts)
    /// nothing is pushed.
    pub fn begin(
        scope: &'s RequestScope,
        transactions: Option<Arc<dyn TransactionScope>>,
        map: PathMap,
    ) -> Self {
        if let Some(tx) = &transactions {
            tx.push_nested(&map);
            scope.push_path_map(map);
        }
        Self {
            scope,
            transactions,
        }
    }

    pub fn is_active(&self) -> bool {
        self.transactions.is_some()
    }
}

impl Drop for NestedOperation<'_> {
    fn drop(&mut self) {
        if let Some(tx) = self.transactions.take() {
            self.scope.pop_path_map();
            tx.pop_nested();
        }
    }
}
