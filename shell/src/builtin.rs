use std::io::{self,Write};
use std::path::{Path,PathBuf};

use crate::global::State;
use crate::search;
use crate::types::{Flow,Token};

/// A builtin receives its arguments without the command name and writes
/// everything, diagnostics included, to `out`.
pub type Builtin = fn(&mut State, &[Token], &mut dyn Write) -> io::Result<Flow>;

const BUILTINS: &[&str] = &["cd", "echo", "exit", "history", "pwd", "type"];

pub fn is_builtin(name: &str) -> bool {
	BUILTINS.contains(&name)
}

pub fn builtin_cd(state: &mut State, args: &[Token], out: &mut dyn Write) -> io::Result<Flow> {
	let arg = match args.first() {
		Some(a) => a.as_str(),
		None => return Ok(Flow::Continue(0)),
	};
	let target = if arg == "~" || arg.starts_with("~/") {
		match state.env.home_dir() {
			Some(home) if arg == "~" => home,
			Some(home) => home.join(&arg[2..]),
			None => {
				writeln!(out, "cd: Home is not set")?;
				return Ok(Flow::Continue(1));
			},
		}
	} else {
		PathBuf::from(arg)
	};
	if let Err(e) = state.env.set_current_dir(&target) {
		log::debug!("cd {}: {}", target.display(), e);
		writeln!(out, "cd: {}: No such file or directory", target.display())?;
		return Ok(Flow::Continue(1));
	}
	Ok(Flow::Continue(0))
}

pub fn builtin_echo(_: &mut State, args: &[Token], out: &mut dyn Write) -> io::Result<Flow> {
	writeln!(out, "{}", args.join(" "))?;
	Ok(Flow::Continue(0))
}

pub fn builtin_pwd(state: &mut State, _: &[Token], out: &mut dyn Write) -> io::Result<Flow> {
	match state.env.current_dir() {
		Ok(cwd) => {
			writeln!(out, "{}", cwd.display())?;
			Ok(Flow::Continue(0))
		},
		Err(e) => {
			writeln!(out, "pwd: {}", e)?;
			Ok(Flow::Continue(1))
		},
	}
}

pub fn builtin_type(state: &mut State, args: &[Token], out: &mut dyn Write) -> io::Result<Flow> {
	let search_path = state.env.search_path();
	let mut status = 0;
	for name in args {
		if is_builtin(name) {
			writeln!(out, "{} is a shell builtin", name)?;
		} else if let Some(path) = search::resolve(name, &search_path) {
			writeln!(out, "{} is {}", name, path.display())?;
		} else {
			writeln!(out, "{}: not found", name)?;
			status = 1;
		}
	}
	Ok(Flow::Continue(status))
}

pub fn builtin_exit(_: &mut State, args: &[Token], out: &mut dyn Write) -> io::Result<Flow> {
	match args.first() {
		None => Ok(Flow::Exit(0)),
		Some(arg) => match arg.parse::<i32>() {
			Ok(code) => Ok(Flow::Exit(code)),
			Err(_) => {
				writeln!(out, "exit: {}: numeric argument required", arg)?;
				Ok(Flow::Exit(2))
			},
		},
	}
}

fn history_file_op(out: &mut dyn Write, path: &Path, r: io::Result<()>) -> io::Result<Flow> {
	match r {
		Ok(()) => Ok(Flow::Continue(0)),
		Err(e) => {
			log::debug!("history file {}: {}", path.display(), e);
			writeln!(out, "history: cannot open {}", path.display())?;
			Ok(Flow::Continue(1))
		},
	}
}

pub fn builtin_history(state: &mut State, args: &[Token], out: &mut dyn Write) -> io::Result<Flow> {
	match (args.first().map(|a| a.as_str()), args.get(1)) {
		(Some("-r"), Some(file)) => {
			let path = Path::new(file);
			let r = state.history.read_from(path).map(|_| ());
			history_file_op(out, path, r)
		},
		(Some("-w"), Some(file)) => {
			let path = Path::new(file);
			let r = state.history.write_to(path);
			history_file_op(out, path, r)
		},
		(Some("-a"), Some(file)) => {
			let path = Path::new(file);
			let r = state.history.append_to(path);
			history_file_op(out, path, r)
		},
		(Some(flag @ ("-r" | "-w" | "-a")), None) => {
			writeln!(out, "history: {}: option requires a file argument", flag)?;
			Ok(Flow::Continue(2))
		},
		(limit, _) => {
			// a non-numeric argument lists everything
			let limit = limit.and_then(|l| l.parse::<usize>().ok());
			for (n, line) in state.history.tail(limit) {
				writeln!(out, "{:5}  {}", n, line)?;
			}
			Ok(Flow::Continue(0))
		},
	}
}

pub fn match_builtin(name: &str) -> Option<Builtin> {
	match name {
		"cd" => Some(builtin_cd),
		"echo" => Some(builtin_echo),
		"exit" => Some(builtin_exit),
		"history" => Some(builtin_history),
		"pwd" => Some(builtin_pwd),
		"type" => Some(builtin_type),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::env::fake::FakeEnv;
	use std::fs;
	use std::os::unix::fs::PermissionsExt;

	fn state() -> State {
		State::new(Box::new(FakeEnv::new()))
	}

	fn run(state: &mut State, line: &str) -> (Flow, String) {
		let argv = crate::lexer::tokenize(line);
		let builtin = match_builtin(&argv[0]).expect("not a builtin");
		let mut out = vec![];
		let flow = builtin(state, &argv[1..], &mut out).unwrap();
		(flow, String::from_utf8(out).unwrap())
	}

	#[test]
	fn every_listed_name_dispatches() {
		for name in BUILTINS {
			assert!(is_builtin(name));
			assert!(match_builtin(name).is_some(), "{}", name);
		}
		assert!(!is_builtin("ls"));
		assert!(match_builtin("ls").is_none());
	}

	#[test]
	fn echo_joins_arguments() {
		let mut s = state();
		assert_eq!(run(&mut s, "echo a   'b  c' d"), (Flow::Continue(0), "a b  c d\n".to_string()));
		assert_eq!(run(&mut s, "echo"), (Flow::Continue(0), "\n".to_string()));
	}

	#[test]
	fn cd_and_pwd() {
		let mut s = state();
		assert_eq!(run(&mut s, "cd /tmp").0, Flow::Continue(0));
		assert_eq!(run(&mut s, "pwd").1, "/tmp\n");
		assert_eq!(run(&mut s, "cd ~").0, Flow::Continue(0));
		assert_eq!(run(&mut s, "pwd").1, "/home/user\n");
		assert_eq!(run(&mut s, "cd /").0, Flow::Continue(0));
		assert_eq!(run(&mut s, "cd ~/src").0, Flow::Continue(0));
		assert_eq!(run(&mut s, "pwd").1, "/home/user/src\n");
	}

	#[test]
	fn cd_without_argument_is_a_no_op() {
		let mut s = state();
		run(&mut s, "cd /tmp");
		assert_eq!(run(&mut s, "cd"), (Flow::Continue(0), String::new()));
		assert_eq!(run(&mut s, "pwd").1, "/tmp\n");
	}

	#[test]
	fn cd_to_missing_dir_keeps_cwd() {
		let mut s = state();
		run(&mut s, "cd /tmp");
		let (flow, out) = run(&mut s, "cd /nope");
		assert_eq!(flow, Flow::Continue(1));
		assert_eq!(out, "cd: /nope: No such file or directory\n");
		assert_eq!(run(&mut s, "pwd").1, "/tmp\n");
	}

	#[test]
	fn cd_home_unset() {
		let mut env = FakeEnv::new();
		env.home = None;
		let mut s = State::new(Box::new(env));
		assert_eq!(run(&mut s, "cd ~"), (Flow::Continue(1), "cd: Home is not set\n".to_string()));
	}

	#[test]
	fn type_reports_builtins_paths_and_misses() {
		let dir = tempfile::tempdir().unwrap();
		let tool = dir.path().join("tool");
		fs::write(&tool, "").unwrap();
		fs::set_permissions(&tool, fs::Permissions::from_mode(0o755)).unwrap();
		let mut env = FakeEnv::new();
		env.search_path = dir.path().as_os_str().to_owned();
		let mut s = State::new(Box::new(env));

		let (flow, out) = run(&mut s, "type echo tool nosuchcmd");
		assert_eq!(flow, Flow::Continue(1));
		assert_eq!(out, format!("echo is a shell builtin\ntool is {}\nnosuchcmd: not found\n", tool.display()));
	}

	#[test]
	fn exit_codes() {
		let mut s = state();
		assert_eq!(run(&mut s, "exit").0, Flow::Exit(0));
		assert_eq!(run(&mut s, "exit 3").0, Flow::Exit(3));
		assert_eq!(run(&mut s, "exit abc"), (Flow::Exit(2), "exit: abc: numeric argument required\n".to_string()));
	}

	#[test]
	fn history_listing() {
		let mut s = state();
		for l in ["ls", "pwd", "echo hi"] {
			s.history.push(l);
		}
		assert_eq!(run(&mut s, "history").1, "    1  ls\n    2  pwd\n    3  echo hi\n");
		assert_eq!(run(&mut s, "history 1").1, "    3  echo hi\n");
	}

	#[test]
	fn history_files() {
		let dir = tempfile::tempdir().unwrap();
		let file = dir.path().join("h");
		let file = file.to_str().unwrap();
		let mut s = state();
		s.history.push("one");
		assert_eq!(run(&mut s, &format!("history -w {}", file)).0, Flow::Continue(0));
		assert_eq!(fs::read_to_string(file).unwrap(), "one\n");

		s.history.push("two");
		run(&mut s, &format!("history -a {}", file));
		assert_eq!(fs::read_to_string(file).unwrap(), "one\none\ntwo\n");

		let mut other = state();
		run(&mut other, &format!("history -r {}", file));
		assert_eq!(other.history.len(), 3);
	}

	#[test]
	fn history_unopenable_file() {
		let mut s = state();
		let (flow, out) = run(&mut s, "history -r /nonexistent/dir/h");
		assert_eq!(flow, Flow::Continue(1));
		assert_eq!(out, "history: cannot open /nonexistent/dir/h\n");
	}
}
