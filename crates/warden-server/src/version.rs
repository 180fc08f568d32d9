// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

pub fn format_version_info() -> String {
	let profile = if cfg!(debug_assertions) {
		"debug"
	} else {
		"release"
	};
	format!(
		"{} {}\nplatform: {}-{}\nprofile:  {}",
		env!("CARGO_PKG_NAME"),
		env!("CARGO_PKG_VERSION"),
		std::env::consts::OS,
		std::env::consts::ARCH,
		profile,
	)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn includes_name_and_version() {
		let info = format_version_info();
		assert!(info.starts_with(concat!("warden-server ", env!("CARGO_PKG_VERSION"))));
		assert!(info.contains(std::env::consts::OS));
	}
}
