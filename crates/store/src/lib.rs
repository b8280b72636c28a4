// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! lw-store: Persistent object store for labwork projects.
//!
//! Each project (and each protocol run) owns one store: a journal-backed
//! table of typed objects with stable integer ids, plus a relation table.
//! Durability happens at [`Store::commit`] boundaries; the journal is
//! folded into a zstd-compressed snapshot at [`Store::compact`] time.

pub mod journal;
pub mod row;
pub mod snapshot;
pub mod store;

pub use journal::{Journal, Op};
pub use row::StoredObject;
pub use store::{Store, StoreError};
