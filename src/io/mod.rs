// SPDX-License-Identifier: AGPL-3.0-or-later
//! I/O readers for pseudo-text count data.

pub mod table;
