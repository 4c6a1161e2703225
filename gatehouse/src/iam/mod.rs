// This file is part of the product Gatehouse.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

pub mod jwt;
pub mod middleware;
mod remote;
mod session;
mod types;

pub use jwt::JwtSessionVerifier;
pub use middleware::{AuthRequest, SessionMiddlewareFactory};
pub use remote::RemoteSessionVerifier;
pub use session::{SessionError, SessionVerifier, VerifiedSession, build_session_verifier};
pub use types::Principal;
