// SPDX-FileCopyrightText: 2026 Mnemon Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage backends for Mnemon: a SQLite store implementing the
//! document, vector, and memory record traits, an in-memory equivalent
//! for tests, and JSON file session persistence.

pub mod mem;
pub mod sessions;
pub mod sqlite;

pub use mem::MemStore;
pub use sessions::{SessionRecord, SessionStore, SessionTurn};
pub use sqlite::SqliteStore;
