use crate::types::Token;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
enum Quote { None, Single, Double }

struct Lexer {
	tokens: Vec<Token>,
	current: String,
	quote: Quote,
	escape: bool,
}

impl Lexer {
	fn is_whitespace(c: char) -> bool {
		c == ' ' || c == '\t'
	}

	fn finish_token(&mut self) {
		if !self.current.is_empty() {
			self.tokens.push(std::mem::take(&mut self.current));
		}
	}

	fn feed(&mut self, c: char) {
		match self.quote {
			Quote::Single => {
				if c == '\'' {
					self.quote = Quote::None;
				} else {
					self.current.push(c);
				}
			},
			Quote::Double => {
				if self.escape {
					// only \" and \\ are escapes inside double quotes
					if c != '"' && c != '\\' {
						self.current.push('\\');
					}
					self.current.push(c);
					self.escape = false;
				} else if c == '\\' {
					self.escape = true;
				} else if c == '"' {
					self.quote = Quote::None;
				} else {
					self.current.push(c);
				}
			},
			Quote::None => {
				if self.escape {
					self.current.push(c);
					self.escape = false;
				} else if c == '\\' {
					self.escape = true;
				} else if c == '\'' {
					self.quote = Quote::Single;
				} else if c == '"' {
					self.quote = Quote::Double;
				} else if Lexer::is_whitespace(c) {
					self.finish_token();
				} else {
					self.current.push(c);
				}
			},
		}
	}
}

/// Split a raw line into tokens, honoring single quotes, double quotes and
/// backslash escapes. An unterminated quote runs to the end of the line.
pub fn tokenize(line: &str) -> Vec<Token> {
	let mut lexer = Lexer { tokens: vec![], current: String::new(), quote: Quote::None, escape: false };
	for c in line.trim_end_matches(|c| c == '\n' || c == '\r').chars() {
		lexer.feed(c);
	}
	if lexer.quote != Quote::None {
		log::debug!("unterminated {:?} quote, closing at end of line", lexer.quote);
	}
	lexer.finish_token();
	lexer.tokens
}
