use std::fs;
use std::io::{self,Write};

use simplelog::{LevelFilter,WriteLogger};

use crate::config::LogConfig;

fn level(config: &LogConfig) -> LevelFilter {
	match config.level {
		Some(ref l) => l.parse().unwrap_or_else(|_| {
			eprintln!("pipesh: unknown log level {:?}, logging disabled", l);
			LevelFilter::Off
		}),
		None => LevelFilter::Off,
	}
}

/// Install the global logger. Off unless a level is configured; writes to
/// the configured file, else standard error.
pub fn init(config: &LogConfig) {
	let level = level(config);
	if level == LevelFilter::Off {
		return;
	}
	let sink: Box<dyn Write + Send> = match config.file {
		Some(ref path) => match fs::OpenOptions::new().create(true).append(true).open(path) {
			Ok(f) => Box::new(f),
			Err(e) => {
				eprintln!("pipesh: cannot open log file {}: {}", path.display(), e);
				Box::new(io::stderr())
			},
		},
		None => Box::new(io::stderr()),
	};
	let _ = WriteLogger::init(level, simplelog::Config::default(), sink);
}
