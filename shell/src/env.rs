//! Process-wide state the interpreter reads and mutates, behind a trait so
//! tests can substitute a fake.

use std::env;
use std::ffi::OsString;
use std::io;
use std::path::{Path,PathBuf};

use nix::unistd;

pub trait Environment {
	/// Colon separated directory list used to resolve command names.
	fn search_path(&self) -> OsString;
	fn current_dir(&self) -> io::Result<PathBuf>;
	fn set_current_dir(&mut self, path: &Path) -> io::Result<()>;
	fn home_dir(&self) -> Option<PathBuf>;
}

/// The real process environment. The search path is read from `PATH` on
/// every lookup unless pinned with [`ProcessEnv::with_search_path`].
#[derive(Debug, Default)]
pub struct ProcessEnv {
	search_path: Option<OsString>,
}

impl ProcessEnv {
	pub fn new() -> ProcessEnv {
		ProcessEnv { search_path: None }
	}

	pub fn with_search_path(search_path: OsString) -> ProcessEnv {
		ProcessEnv { search_path: Some(search_path) }
	}
}

impl Environment for ProcessEnv {
	fn search_path(&self) -> OsString {
		match self.search_path {
			Some(ref p) => p.clone(),
			None => env::var_os("PATH").unwrap_or_default(),
		}
	}

	fn current_dir(&self) -> io::Result<PathBuf> {
		Ok(unistd::getcwd()?)
	}

	fn set_current_dir(&mut self, path: &Path) -> io::Result<()> {
		unistd::chdir(path)?;
		log::debug!("working directory is now {}", path.display());
		Ok(())
	}

	fn home_dir(&self) -> Option<PathBuf> {
		env::var_os("HOME").map(PathBuf::from)
	}
}
