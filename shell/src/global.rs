use crate::env::Environment;
use crate::history::History;

pub struct State {
	pub env: Box<dyn Environment>,
	pub history: History,
}

impl State {
	pub fn new(env: Box<dyn Environment>) -> State {
		State { env, history: History::new() }
	}
}
