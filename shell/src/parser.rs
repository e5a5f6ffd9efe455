use std::{error,fmt};
use std::path::PathBuf;

use crate::builtin;
use crate::types::*;

const PIPE: &str = "|";

#[derive(Debug, PartialEq, Eq)]
pub enum ParseError {
	/// A `|` with nothing on one side of it.
	EmptyStage,
	/// Only redirection was left once the operator and its target were stripped.
	EmptyCommand,
	MissingTarget(String),
}

impl fmt::Display for ParseError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			ParseError::EmptyStage => write!(f, "syntax error near unexpected token `|'"),
			ParseError::EmptyCommand => write!(f, "syntax error: missing command before redirection"),
			ParseError::MissingTarget(op) => write!(f, "syntax error: expected a file name after `{}'", op),
		}
	}
}

impl error::Error for ParseError {}

type ParseResult<T> = Result<T, ParseError>;

fn match_operator(token: &str) -> Option<(Stream, Mode)> {
	match token {
		">" | "1>" => Some((Stream::Stdout, Mode::Truncate)),
		">>" | "1>>" => Some((Stream::Stdout, Mode::Append)),
		"2>" => Some((Stream::Stderr, Mode::Truncate)),
		"2>>" => Some((Stream::Stderr, Mode::Append)),
		_ => None,
	}
}

/// Strip the first redirection clause from `tokens`.
///
/// Everything from the operator onward is cut off, so redirection must trail
/// the command; any later operators in the same stage go with it.
pub fn extract_redirect(tokens: &mut Vec<Token>) -> ParseResult<Option<Redirect>> {
	let found = tokens.iter().enumerate()
		.find_map(|(i, t)| match_operator(t).map(|op| (i, op)));
	let (i, (stream, mode)) = match found {
		Some(f) => f,
		None => return Ok(None),
	};
	let target = match tokens.get(i + 1) {
		Some(t) => PathBuf::from(t),
		None => return Err(ParseError::MissingTarget(tokens[i].clone())),
	};
	if tokens.len() > i + 2 {
		log::debug!("dropping {} token(s) after redirection target", tokens.len() - i - 2);
	}
	tokens.truncate(i);
	Ok(Some(Redirect { stream, mode, target }))
}

fn parse_stage(mut tokens: Vec<Token>) -> ParseResult<Stage> {
	if tokens.is_empty() {
		return Err(ParseError::EmptyStage);
	}
	let redirect = extract_redirect(&mut tokens)?;
	if tokens.is_empty() {
		return Err(ParseError::EmptyCommand);
	}
	let (stdout_target, stderr_target) = match redirect {
		Some(r) if r.stream == Stream::Stdout => (Some(r), None),
		Some(r) => (None, Some(r)),
		None => (None, None),
	};
	let is_builtin = builtin::is_builtin(&tokens[0]);
	Ok(Stage { argv: tokens, stdout_target, stderr_target, is_builtin, resolved_path: None })
}

/// Split a token sequence on `|` into stages. `tokens` must not be empty.
pub fn parse(tokens: Vec<Token>) -> ParseResult<Pipeline> {
	let mut stages = vec![];
	let mut current = vec![];
	for token in tokens {
		if token == PIPE {
			stages.push(parse_stage(std::mem::take(&mut current))?);
		} else {
			current.push(token);
		}
	}
	stages.push(parse_stage(current)?);
	Ok(Pipeline { stages })
}
