use std::fs;
use std::io::{self,BufRead,Write};
use std::path::Path;

/// Append-only list of submitted lines.
#[derive(Debug, Default, Clone)]
pub struct History {
	entries: Vec<String>,
	// entries before this index were already written by `append_to`
	appended: usize,
}

impl History {
	pub fn new() -> History {
		History::default()
	}

	pub fn push(&mut self, line: &str) {
		if !line.is_empty() {
			self.entries.push(line.to_string());
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// The last `limit` entries (all of them if `None`), numbered from 1.
	pub fn tail(&self, limit: Option<usize>) -> impl Iterator<Item = (usize, &str)> {
		let start = match limit {
			Some(n) if n > 0 && n < self.entries.len() => self.entries.len() - n,
			_ => 0,
		};
		self.entries[start..].iter().enumerate().map(move |(i, e)| (start + i + 1, e.as_str()))
	}

	pub fn read_from(&mut self, path: &Path) -> io::Result<usize> {
		let file = fs::File::open(path)?;
		let before = self.entries.len();
		for line in io::BufReader::new(file).lines() {
			self.push(line?.trim_end_matches('\r'));
		}
		Ok(self.entries.len() - before)
	}

	pub fn write_to(&self, path: &Path) -> io::Result<()> {
		let mut file = io::BufWriter::new(fs::File::create(path)?);
		for e in &self.entries {
			writeln!(file, "{}", e)?;
		}
		file.flush()
	}

	/// Append the entries added since the previous call.
	pub fn append_to(&mut self, path: &Path) -> io::Result<()> {
		let file = fs::OpenOptions::new().create(true).append(true).open(path)?;
		let mut file = io::BufWriter::new(file);
		for e in &self.entries[self.appended..] {
			writeln!(file, "{}", e)?;
		}
		file.flush()?;
		self.appended = self.entries.len();
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::History;
	use std::fs;

	fn history(lines: &[&str]) -> History {
		let mut h = History::new();
		for l in lines {
			h.push(l);
		}
		h
	}

	#[test]
	fn tail_numbers_from_one() {
		let h = history(&["a", "b", "c"]);
		let all: Vec<_> = h.tail(None).collect();
		assert_eq!(all, vec![(1, "a"), (2, "b"), (3, "c")]);
		let last: Vec<_> = h.tail(Some(2)).collect();
		assert_eq!(last, vec![(2, "b"), (3, "c")]);
		assert_eq!(h.tail(Some(10)).count(), 3);
		assert_eq!(h.tail(Some(0)).count(), 3);
	}

	#[test]
	fn empty_lines_are_not_recorded() {
		let h = history(&["", "ls", ""]);
		assert_eq!(h.len(), 1);
	}

	#[test]
	fn write_then_read() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("hist");
		history(&["echo hi", "pwd"]).write_to(&path).unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "echo hi\npwd\n");

		let mut h = history(&["ls"]);
		assert_eq!(h.read_from(&path).unwrap(), 2);
		let all: Vec<_> = h.tail(None).map(|(_, e)| e.to_string()).collect();
		assert_eq!(all, vec!["ls", "echo hi", "pwd"]);
	}

	#[test]
	fn read_skips_blank_lines() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("hist");
		fs::write(&path, "one\n\n\ntwo\n").unwrap();
		let mut h = History::new();
		assert_eq!(h.read_from(&path).unwrap(), 2);
	}

	#[test]
	fn append_only_writes_new_entries() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("hist");
		let mut h = history(&["a", "b"]);
		h.append_to(&path).unwrap();
		h.push("c");
		h.append_to(&path).unwrap();
		h.append_to(&path).unwrap();
		assert_eq!(fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
	}
}
