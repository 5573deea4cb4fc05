// SPDX-FileCopyrightText: 2026 Ticketdesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Traits for collaborators the store consumes but does not implement.

pub mod thread;

pub use thread::ThreadChecker;
