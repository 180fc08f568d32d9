// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP surface of the user migration wizard.
//!
//! Routes live under `/api/tenants/{tenant_id}/migrations`. Admin
//! authentication is applied by the router this one is merged into.

mod driver;
pub mod error;
pub mod handlers;
pub mod registry;
pub mod routes;
pub mod state;
pub mod view;

pub use error::{MigrateApiError, SessionError};
pub use handlers::connection::CREDENTIAL_HEADER;
pub use registry::{SessionEntry, SessionRegistry};
pub use routes::migrate_routes;
pub use state::{ImportDefaults, MigrateState};
