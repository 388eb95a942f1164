// Copyright (c) AlphaVelocity.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Ledger and calendar reconciliation engine.
//!
//! Everything that carries an invariant lives here: the balance ledger
//! (source balances move only through [`ledger::apply`] / [`ledger::reverse`]),
//! the pure recurrence expander, the timeline reconciler, and the predicted-
//! bill lifecycle. The command layer is presentation glue on top.

pub mod error;
pub mod events;
pub mod ledger;
pub mod predictions;
pub mod recurrence;
pub mod timeline;

pub use error::{EngineError, EngineResult};
