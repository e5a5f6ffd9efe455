use std::env;
use std::ffi::OsStr;
use std::path::{Path,PathBuf};

use nix::unistd::{self,AccessFlags};

fn is_executable(path: &Path) -> bool {
	match path.metadata() {
		Ok(meta) if !meta.is_dir() => unistd::access(path, AccessFlags::X_OK).is_ok(),
		_ => false,
	}
}

/// Find `name` in the colon separated `search_path`, first directory wins.
///
/// A name containing `/` is not searched for; it is checked as given.
pub fn resolve(name: &str, search_path: &OsStr) -> Option<PathBuf> {
	if name.is_empty() {
		return None;
	}
	if name.contains('/') {
		let path = PathBuf::from(name);
		return if is_executable(&path) { Some(path) } else { None };
	}
	for dir in env::split_paths(search_path) {
		if dir.as_os_str().is_empty() {
			continue;
		}
		let candidate = dir.join(name);
		if is_executable(&candidate) {
			log::debug!("resolved {} to {}", name, candidate.display());
			return Some(candidate);
		}
	}
	log::debug!("{} not found in search path", name);
	None
}
