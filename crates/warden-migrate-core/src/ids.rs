// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			/// Generate a new random ID.
			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl FromStr for $name {
			type Err = uuid::Error;

			fn from_str(s: &str) -> Result<Self, Self::Err> {
				Uuid::parse_str(s.trim()).map(Self)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(TenantId, "Tenant (project) owning an isolated user store.");
define_id_type!(ImportSessionId, "One migration wizard run, from credentials to result.");
define_id_type!(UserId, "Destination user identifier.");

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn parses_with_surrounding_whitespace() {
		let id: UserId = " 6f1c1f7e-5c43-4c83-9a0e-0f6b3b9d2f10 ".parse().unwrap();
		assert_eq!(id.to_string(), "6f1c1f7e-5c43-4c83-9a0e-0f6b3b9d2f10");
	}

	#[test]
	fn rejects_non_uuid() {
		assert!("user_42".parse::<UserId>().is_err());
	}

	#[test]
	fn serializes_transparently() {
		let id = TenantId::generate();
		let json = serde_json::to_string(&id).unwrap();
		assert_eq!(json, format!("\"{id}\""));
	}

	proptest! {
		#[test]
		fn generated_ids_are_unique(_seed in 0u32..1000) {
			prop_assert_ne!(ImportSessionId::generate(), ImportSessionId::generate());
		}
	}
}
