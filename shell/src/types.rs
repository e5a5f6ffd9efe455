use std::path::PathBuf;

pub type Token = String;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Stream { Stdout, Stderr }

impl Stream {
	pub fn fd(self) -> i32 {
		match self {
			Stream::Stdout => libc::STDOUT_FILENO,
			Stream::Stderr => libc::STDERR_FILENO,
		}
	}
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Mode { Truncate, Append }

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Redirect {
	pub stream: Stream,
	pub mode: Mode,
	pub target: PathBuf,
}

/// One command of a pipeline. `argv` is never empty.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Stage {
	pub argv: Vec<Token>,
	pub stdout_target: Option<Redirect>,
	pub stderr_target: Option<Redirect>,
	pub is_builtin: bool,
	pub resolved_path: Option<PathBuf>,
}

impl Stage {
	pub fn name(&self) -> &str {
		&self.argv[0]
	}

	pub fn redirects(&self) -> impl Iterator<Item = &Redirect> {
		self.stdout_target.iter().chain(self.stderr_target.iter())
	}
}

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Pipeline {
	pub stages: Vec<Stage>,
}

impl Pipeline {
	pub fn pipe_count(&self) -> usize {
		self.stages.len() - 1
	}
}

/// What the caller should do once a line has been evaluated.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Flow {
	/// Keep reading lines; carries the status of the last stage.
	Continue(i32),
	Exit(i32),
}
