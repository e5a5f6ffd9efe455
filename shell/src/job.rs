use nix::errno::Errno;
use nix::sys::wait::{self,WaitStatus};
use nix::unistd::{self,ForkResult,Pid};

pub trait WaitStatusExt {
	fn code(&self) -> Option<i32>;
}

impl WaitStatusExt for WaitStatus {
	fn code(&self) -> Option<i32> {
		match *self {
			WaitStatus::Exited(_, code) => Some(code),
			WaitStatus::Signaled(_, sig, _) => Some(128 + sig as i32),
			_ => None,
		}
	}
}

/// One forked stage.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Process {
	pub pid: Pid,
	pub stage: usize,
	pub status: Option<WaitStatus>,
}

/// Every process spawned for one pipeline. Reaped as a whole with [`Job::wait`].
#[derive(Debug, Default)]
pub struct Job {
	pub processes: Vec<Process>,
}

impl Job {
	pub fn new(size_hint: usize) -> Job {
		Job { processes: Vec::with_capacity(size_hint) }
	}

	pub fn is_empty(&self) -> bool {
		self.processes.is_empty()
	}

	/// Fork and, in the parent, record the child against `stage`.
	///
	/// # Safety
	/// Same contract as [`unistd::fork`]: the child of a multi-threaded
	/// process may only do async-signal-safe work before exec or `_exit`.
	pub unsafe fn push_fork(&mut self, stage: usize) -> nix::Result<ForkResult> {
		let r = unistd::fork()?;
		if let ForkResult::Parent { child } = r {
			self.processes.push(Process { pid: child, stage, status: None });
		}
		Ok(r)
	}

	/// Block until every recorded process has terminated, in spawn order.
	pub fn wait(&mut self) {
		for pr in self.processes.iter_mut().filter(|pr| pr.status.is_none()) {
			loop {
				match wait::waitpid(pr.pid, None) {
					Ok(status @ WaitStatus::Exited(..)) | Ok(status @ WaitStatus::Signaled(..)) => {
						log::debug!("stage {} (pid {}) finished: {:?}", pr.stage, pr.pid, status);
						pr.status = Some(status);
						break;
					},
					Ok(_) | Err(Errno::EINTR) => continue,
					Err(e) => {
						log::warn!("waitpid {}: {}", pr.pid, e);
						break;
					},
				}
			}
		}
	}

	/// Status of the last stage, once reaped.
	pub fn last_status(&self) -> Option<i32> {
		self.processes.last().and_then(|pr| pr.status).and_then(|s| s.code())
	}
}
