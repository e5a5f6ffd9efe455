use std::io;
use std::path::Path;
use io::BufRead;
use io::Write;

use pipesh::config::Config;
use pipesh::env::ProcessEnv;
use pipesh::{eval_line,logging,Flow,State};

fn save_history(state: &State, path: Option<&Path>) {
	if let Some(path) = path {
		if let Err(e) = state.history.write_to(path) {
			log::warn!("saving history to {}: {}", path.display(), e);
		}
	}
}

/// Next input line without its terminator, `None` at end of input. Bytes
/// that are not UTF-8 are replaced rather than ending the session.
fn read_line<R: BufRead>(input: &mut R) -> io::Result<Option<String>> {
	let mut buf = Vec::new();
	if input.read_until(b'\n', &mut buf)? == 0 {
		return Ok(None);
	}
	let line = String::from_utf8_lossy(&buf);
	Ok(Some(line.trim_end_matches(|c| c == '\n' || c == '\r').to_string()))
}

fn main() {
	let config = Config::load();
	logging::init(&config.log);

	let mut state = State::new(Box::new(ProcessEnv::new()));
	let histfile = config.history_file.as_deref();
	if let Some(path) = histfile {
		match state.history.read_from(path) {
			Ok(n) => log::debug!("loaded {} history entries from {}", n, path.display()),
			Err(e) => log::debug!("no history loaded from {}: {}", path.display(), e),
		}
	}

	let mut stdout = io::stdout();
	let stdin = io::stdin();
	let mut stdin_locked = stdin.lock();
	let code = loop {
		let _ = stdout.write_all(config.prompt().as_bytes());
		let _ = stdout.flush();
		let line = match read_line(&mut stdin_locked) {
			Ok(Some(line)) => line,
			Ok(None) => {
				let _ = stdout.write_all(b"\n");
				break 0;
			},
			Err(e) => {
				eprintln!("pipesh: {}", e);
				break 1;
			},
		};
		state.history.push(&line);
		if let Flow::Exit(code) = eval_line(&mut state, &line) {
			break code;
		}
	};
	save_history(&state, histfile);
	let _ = stdout.flush();
	std::process::exit(code)
}
