use std::{error,ffi,fmt,fs,io};
use std::ffi::CString;
use std::fs::File;
use std::io::Write;
use std::mem::ManuallyDrop;
use std::os::fd::{AsRawFd,FromRawFd,OwnedFd,RawFd};
use std::os::unix::ffi::OsStrExt;
use std::path::PathBuf;

use nix::sys::signal::{self,SigHandler,Signal};
use nix::unistd::{self,ForkResult};

use crate::{builtin,lexer,parser,search};
use crate::global::State;
use crate::job::Job;
use crate::types::*;

const EXIT_FAILURE: i32 = 1;
const EXIT_SYNTAX: i32 = 2;
const EXIT_CANNOT_EXEC: i32 = 126;
const EXIT_NOT_FOUND: i32 = 127;

#[derive(Debug)]
pub enum ExecError {
	NixError(nix::Error),
	IoError(io::Error),
	NulError(ffi::NulError),
	NotFound(String),
	Target(PathBuf, io::Error),
	/// Fork failed while starting the named stage.
	Fork(String, nix::Error),
}
impl From<nix::Error> for ExecError {
	fn from(e: nix::Error) -> ExecError {
		ExecError::NixError(e)
	}
}
impl From<io::Error> for ExecError {
	fn from(e: io::Error) -> ExecError {
		ExecError::IoError(e)
	}
}
impl From<ffi::NulError> for ExecError {
	fn from(e: ffi::NulError) -> ExecError {
		ExecError::NulError(e)
	}
}
impl fmt::Display for ExecError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ExecError::NixError(e) => write!(f, "{}", e.desc()),
			ExecError::IoError(e) => write!(f, "{}", e),
			ExecError::NulError(_) => write!(f, "argument contains a nul byte"),
			ExecError::NotFound(name) => write!(f, "{}: command not found", name),
			ExecError::Target(path, e) => write!(f, "{}: {}", path.display(), e),
			ExecError::Fork(name, e) => write!(f, "{}: fork: {}", name, e.desc()),
		}
	}
}
impl error::Error for ExecError {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		match self {
			ExecError::NixError(e) | ExecError::Fork(_, e) => Some(e),
			ExecError::IoError(e) | ExecError::Target(_, e) => Some(e),
			ExecError::NulError(e) => Some(e),
			ExecError::NotFound(_) => None,
		}
	}
}

impl ExecError {
	fn status(&self) -> i32 {
		match self {
			ExecError::NotFound(_) => EXIT_NOT_FOUND,
			ExecError::Target(..) => EXIT_FAILURE,
			_ => EXIT_CANNOT_EXEC,
		}
	}

	fn report(&self) {
		match self {
			// stdout, matching what users of the interactive shell expect
			ExecError::NotFound(_) => {
				let mut stdout = io::stdout();
				let _ = writeln!(stdout, "{}", self);
				let _ = stdout.flush();
			},
			_ => {
				let _ = writeln!(io::stderr(), "pipesh: {}", self);
			},
		}
	}
}

/// Writer over an inherited descriptor that never closes it.
fn fd_writer(fd: RawFd) -> ManuallyDrop<File> {
	ManuallyDrop::new(unsafe { File::from_raw_fd(fd) })
}

fn open_target(redirect: &Redirect) -> Result<File, ExecError> {
	let mut oopt = fs::OpenOptions::new();
	let _ = match redirect.mode {
		Mode::Truncate => oopt.write(true).create(true).truncate(true),
		Mode::Append => oopt.append(true).create(true),
	};
	oopt.open(&redirect.target).map_err(|e| ExecError::Target(redirect.target.clone(), e))
}

/// Redirection files of one stage, opened once before anything is forked.
#[derive(Debug, Default)]
struct Targets {
	stdout: Option<File>,
	stderr: Option<File>,
}

impl Targets {
	fn open(stage: &Stage) -> Result<Targets, ExecError> {
		let mut targets = Targets::default();
		for redirect in stage.redirects() {
			let file = open_target(redirect)?;
			log::debug!("{:?} of {} goes to {}", redirect.stream, stage.name(), redirect.target.display());
			match redirect.stream {
				Stream::Stdout => targets.stdout = Some(file),
				Stream::Stderr => targets.stderr = Some(file),
			}
		}
		Ok(targets)
	}

	fn files(&self) -> impl Iterator<Item = (&File, RawFd)> {
		let stdout = self.stdout.as_ref().map(|f| (f, Stream::Stdout.fd()));
		let stderr = self.stderr.as_ref().map(|f| (f, Stream::Stderr.fd()));
		stdout.into_iter().chain(stderr)
	}
}

/// A standard descriptor temporarily pointed at a file; put back on drop.
struct SavedFd {
	fd: RawFd,
	saved: OwnedFd,
}

impl SavedFd {
	fn redirect(file: &File, fd: RawFd) -> nix::Result<SavedFd> {
		let saved = unsafe { OwnedFd::from_raw_fd(unistd::dup(fd)?) };
		unistd::dup2(file.as_raw_fd(), fd)?;
		Ok(SavedFd { fd, saved })
	}
}

impl Drop for SavedFd {
	fn drop(&mut self) {
		if let Err(e) = unistd::dup2(self.saved.as_raw_fd(), self.fd) {
			log::warn!("restoring fd {}: {}", self.fd, e);
		}
	}
}

/// Run a lone builtin in the interpreter process itself, so that `cd`,
/// `history -r` and `exit` take effect.
fn run_direct(state: &mut State, stage: &Stage) -> Result<Flow, ExecError> {
	let builtin = builtin::match_builtin(stage.name())
		.ok_or_else(|| ExecError::NotFound(stage.name().to_string()))?;
	let targets = Targets::open(stage)?;

	let stdout = io::stdout();
	let mut out = stdout.lock();
	out.flush()?;
	let mut saved = Vec::with_capacity(2);
	for (file, fd) in targets.files() {
		saved.push(SavedFd::redirect(file, fd)?);
	}
	let r = builtin(state, &stage.argv[1..], &mut out);
	let flushed = out.flush();
	drop(saved);
	let flow = r?;
	flushed?;
	Ok(flow)
}

fn resolve_stages(state: &State, pipeline: &mut Pipeline) -> Result<(), ExecError> {
	let search_path = state.env.search_path();
	for stage in pipeline.stages.iter_mut().filter(|s| !s.is_builtin) {
		match search::resolve(stage.name(), &search_path) {
			Some(path) => stage.resolved_path = Some(path),
			None => return Err(ExecError::NotFound(stage.name().to_string())),
		}
	}
	Ok(())
}

enum Program {
	Builtin(builtin::Builtin),
	External { path: CString, argv: Vec<CString> },
}

/// Everything a child needs, built in the parent so the child allocates as
/// little as possible between fork and exec.
struct Launch<'a> {
	stage: &'a Stage,
	program: Program,
	targets: Targets,
}

impl<'a> Launch<'a> {
	fn prepare(stage: &'a Stage) -> Result<Launch<'a>, ExecError> {
		let program = match (&stage.resolved_path, builtin::match_builtin(stage.name())) {
			(None, Some(b)) if stage.is_builtin => Program::Builtin(b),
			(Some(path), _) => {
				let argv: Result<Vec<CString>, ffi::NulError> = stage.argv.iter().map(|a| CString::new(a.as_bytes())).collect();
				Program::External { path: CString::new(path.as_os_str().as_bytes())?, argv: argv? }
			},
			_ => return Err(ExecError::NotFound(stage.name().to_string())),
		};
		Ok(Launch { stage, program, targets: Targets::open(stage)? })
	}
}

struct Pipe {
	read: OwnedFd,
	write: OwnedFd,
}

fn open_pipes(count: usize) -> nix::Result<Vec<Pipe>> {
	(0 .. count).map(|_| unistd::pipe().map(|(read, write)| Pipe { read, write })).collect()
}

fn do_exec_stage(state: &mut State, index: usize, launch: Launch, pipes: Vec<Pipe>) -> Result<i32, ExecError> {
	// the Rust runtime ignores SIGPIPE and exec keeps ignored dispositions
	unsafe { signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) }?;
	if index > 0 {
		unistd::dup2(pipes[index - 1].read.as_raw_fd(), libc::STDIN_FILENO)?;
	}
	if index < pipes.len() {
		unistd::dup2(pipes[index].write.as_raw_fd(), libc::STDOUT_FILENO)?;
	}
	drop(pipes);
	// redirection wins over the pipe when both name the same stream
	for (file, fd) in launch.targets.files() {
		unistd::dup2(file.as_raw_fd(), fd)?;
	}
	drop(launch.targets);

	match launch.program {
		Program::External { path, argv } => match unistd::execv(&path, &argv[..])? {},
		Program::Builtin(builtin) => {
			// a directory or history change made here dies with this process
			let mut out = fd_writer(libc::STDOUT_FILENO);
			let flow = builtin(state, &launch.stage.argv[1..], &mut *out)?;
			out.flush()?;
			match flow {
				Flow::Continue(code) | Flow::Exit(code) => Ok(code),
			}
		},
	}
}

fn exec_stage(state: &mut State, index: usize, mut launches: Vec<Launch>, pipes: Vec<Pipe>) -> ! {
	let launch = launches.swap_remove(index);
	drop(launches);
	let stage = launch.stage;
	// the logger's lock may have been held by another thread at fork time
	log::set_max_level(log::LevelFilter::Off);
	let code = do_exec_stage(state, index, launch, pipes).unwrap_or_else(|e| {
		let _ = writeln!(&mut *fd_writer(libc::STDERR_FILENO), "{}: {}", stage.name(), e);
		EXIT_CANNOT_EXEC
	});
	unsafe { libc::_exit(code) }
}

/// Fork every stage in order. On a fork failure the remaining stages are
/// skipped; the caller still reaps whatever made it into `job`.
fn spawn_stages(state: &mut State, launches: Vec<Launch>, pipes: Vec<Pipe>, job: &mut Job) -> Result<(), ExecError> {
	let _ = io::stdout().flush();
	for i in 0 .. launches.len() {
		let forked = unsafe { job.push_fork(i) }
			.map_err(|e| ExecError::Fork(launches[i].stage.name().to_string(), e))?;
		match forked {
			ForkResult::Parent { child } => {
				log::debug!("stage {} ({}) is pid {}", i, launches[i].stage.name(), child);
			},
			ForkResult::Child => exec_stage(state, i, launches, pipes),
		}
	}
	Ok(())
}

fn eval_pipeline(state: &mut State, pipeline: &mut Pipeline) -> Result<Flow, ExecError> {
	if pipeline.stages.len() == 1 && pipeline.stages[0].is_builtin {
		return run_direct(state, &pipeline.stages[0]);
	}

	resolve_stages(state, pipeline)?;
	let launches = pipeline.stages.iter().map(Launch::prepare).collect::<Result<Vec<_>, _>>()?;
	let pipes = open_pipes(pipeline.pipe_count())?;

	let mut job = Job::new(launches.len());
	// launches and pipes are consumed, so every descriptor is closed before waiting
	let spawned = spawn_stages(state, launches, pipes, &mut job);
	job.wait();
	spawned?;
	Ok(Flow::Continue(job.last_status().unwrap_or(EXIT_CANNOT_EXEC)))
}

/// Tokenize, build, resolve, run and reap one line. Returns only after every
/// process spawned for it has terminated.
pub fn eval_line(state: &mut State, line: &str) -> Flow {
	let tokens = lexer::tokenize(line);
	if tokens.is_empty() {
		return Flow::Continue(0);
	}
	let mut pipeline = match parser::parse(tokens) {
		Ok(p) => p,
		Err(e) => {
			let _ = writeln!(io::stderr(), "pipesh: {}", e);
			return Flow::Continue(EXIT_SYNTAX);
		},
	};
	log::info!("running {} stage(s): {}", pipeline.stages.len(), line.trim_end());
	match eval_pipeline(state, &mut pipeline) {
		Ok(flow) => flow,
		Err(e) => {
			log::debug!("{:?}", e);
			e.report();
			Flow::Continue(e.status())
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use nix::errno::Errno;

	#[test]
	fn fork_failure_names_the_stage() {
		let e = ExecError::Fork("sort".to_string(), Errno::EAGAIN);
		assert_eq!(e.to_string(), format!("sort: fork: {}", Errno::EAGAIN.desc()));
		assert_eq!(e.status(), EXIT_CANNOT_EXEC);
		assert!(error::Error::source(&e).is_some());
	}

	#[test]
	fn error_statuses() {
		assert_eq!(ExecError::NotFound("x".to_string()).status(), EXIT_NOT_FOUND);
		let target = ExecError::Target(PathBuf::from("/x"), io::Error::from(io::ErrorKind::NotFound));
		assert_eq!(target.status(), EXIT_FAILURE);
		assert_eq!(ExecError::from(Errno::EBADF).status(), EXIT_CANNOT_EXEC);
	}
}
