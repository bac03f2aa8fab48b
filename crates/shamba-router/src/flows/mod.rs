// SPDX-FileCopyrightText: 2026 Shamba Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sub-flows the engine runs once a message has been classified.

mod join;
mod replies;
mod signup;
mod stop;
mod voucher;
