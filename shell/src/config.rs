use serde::Deserialize;
use std::env;
use std::path::{Path,PathBuf};

const DEFAULT_PROMPT: &str = "$ ";

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct LogConfig {
	/// `off`, `error`, `warn`, `info`, `debug` or `trace`.
	#[serde(default)]
	pub level: Option<String>,
	#[serde(default)]
	pub file: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Default, PartialEq)]
pub struct Config {
	#[serde(default)]
	pub prompt: Option<String>,
	#[serde(default)]
	pub history_file: Option<PathBuf>,
	#[serde(default)]
	pub log: LogConfig,
}

impl Config {
	pub fn prompt(&self) -> &str {
		self.prompt.as_deref().unwrap_or(DEFAULT_PROMPT)
	}

	pub fn parse(text: &str) -> Result<Config, toml::de::Error> {
		toml::from_str(text)
	}

	fn path() -> Option<PathBuf> {
		if let Some(p) = env::var_os("PIPESH_CONFIG") {
			return Some(PathBuf::from(p));
		}
		env::var_os("HOME").map(|home| Path::new(&home).join(".config/pipesh/config.toml"))
	}

	fn read(path: &Path) -> Config {
		let text = match std::fs::read_to_string(path) {
			Ok(t) => t,
			Err(_) => return Config::default(),
		};
		match Config::parse(&text) {
			Ok(c) => c,
			Err(e) => {
				eprintln!("pipesh: ignoring {}: {}", path.display(), e);
				Config::default()
			},
		}
	}

	/// Apply `HISTFILE`, `PIPESH_LOG` and `PIPESH_LOG_FILE` on top of the file.
	pub fn with_env_overrides<F>(mut self, var: F) -> Config where F: Fn(&str) -> Option<String> {
		if let Some(h) = var("HISTFILE").filter(|h| !h.is_empty()) {
			self.history_file = Some(PathBuf::from(h));
		}
		if let Some(l) = var("PIPESH_LOG") {
			self.log.level = Some(l);
		}
		if let Some(f) = var("PIPESH_LOG_FILE") {
			self.log.file = Some(PathBuf::from(f));
		}
		self
	}

	/// Config file (if any) plus environment overrides. Never fails; a bad
	/// file is reported and ignored.
	pub fn load() -> Config {
		let config = match Config::path() {
			Some(p) => Config::read(&p),
			None => Config::default(),
		};
		config.with_env_overrides(|k| env::var(k).ok())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_file_gives_defaults() {
		let c = Config::parse("").unwrap();
		assert_eq!(c, Config::default());
		assert_eq!(c.prompt(), "$ ");
	}

	#[test]
	fn parses_all_fields() {
		let c = Config::parse(r#"
			prompt = "pipesh> "
			history_file = "/tmp/hist"

			[log]
			level = "debug"
			file = "/tmp/pipesh.log"
		"#).unwrap();
		assert_eq!(c.prompt(), "pipesh> ");
		assert_eq!(c.history_file, Some(PathBuf::from("/tmp/hist")));
		assert_eq!(c.log.level.as_deref(), Some("debug"));
		assert_eq!(c.log.file, Some(PathBuf::from("/tmp/pipesh.log")));
	}

	#[test]
	fn rejects_wrong_types() {
		assert!(Config::parse("prompt = 3").is_err());
	}

	#[test]
	fn environment_overrides_file() {
		let c = Config::parse("history_file = \"/a\"\n[log]\nlevel = \"warn\"").unwrap();
		let c = c.with_env_overrides(|k| match k {
			"HISTFILE" => Some("/b".to_string()),
			"PIPESH_LOG" => Some("trace".to_string()),
			_ => None,
		});
		assert_eq!(c.history_file, Some(PathBuf::from("/b")));
		assert_eq!(c.log.level.as_deref(), Some("trace"));
		assert_eq!(c.log.file, None);
	}

	#[test]
	fn empty_histfile_is_ignored() {
		let c = Config::default().with_env_overrides(|k| if k == "HISTFILE" { Some(String::new()) } else { None });
		assert_eq!(c.history_file, None);
	}
}
