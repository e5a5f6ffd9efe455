//! Core of a small line-oriented shell.
//!
//! A line goes through [`lexer::tokenize`], is split into a [`types::Pipeline`]
//! by [`parser::parse`], and is run by [`eval::eval_line`]: builtins alone on a
//! line run in this process, everything else is forked, wired with pipes and
//! redirections, exec'd and reaped before `eval_line` returns.

pub mod builtin;
pub mod config;
pub mod env;
pub mod eval;
pub mod global;
pub mod history;
pub mod job;
pub mod lexer;
pub mod logging;
pub mod parser;
pub mod search;
pub mod types;

pub use eval::eval_line;
pub use global::State;
pub use types::Flow;
