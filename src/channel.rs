// Blocking command/response link to one instrument. CoreClient is the network side,
// ScriptedChannel answers from canned replies.

use std::collections::{HashMap, VecDeque};
use std::io;
use std::str;
use std::time::Duration;

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub struct ReadChunk {
	pub data: Vec<u8>,
	// Last piece of the response message
	pub end: bool,
}

pub trait Channel {
	fn write(&mut self, cmd:&str) -> Result<()>;

	fn read_raw(&mut self) -> Result<Vec<u8>>;

	// At most max bytes of the pending response
	fn read_chunk(&mut self, max:usize) -> Result<ReadChunk>;

	fn timeout(&self) -> Duration;

	fn set_timeout(&mut self, timeout:Duration) -> Result<()>;

	fn query(&mut self, cmd:&str) -> Result<String> {
		self.write(cmd)?;
		let raw = self.read_raw()?;
		decode(&raw, cmd)
	}
}

pub(crate) fn decode(raw:&[u8], what:&str) -> Result<String> {
	str::from_utf8(raw)
		.map(|s| s.trim_end_matches(|c| c == '\n' || c == '\r').to_owned())
		.map_err(|_| Error::Utf8(what.to_owned()))
}

#[derive(Clone)]
enum Reply {
	Data(Vec<u8>),
	Fail(String),
}

struct Pending {
	data: Vec<u8>,
	pos: usize,
}

// Each scripted command owns a queue of replies and the last one is sticky.
// Reading after an unscripted command times out, like an instrument that never answers.
pub struct ScriptedChannel {
	replies: HashMap<String, VecDeque<Reply>>,
	pending: Option<std::result::Result<Pending, String>>,
	sent: Vec<String>,
	timeout: Duration,
	timeouts_seen: Vec<Duration>,
}

impl ScriptedChannel {

	pub fn new() -> Self {
		Self{ replies: HashMap::new(), pending: None, sent: vec![], timeout: Duration::from_secs(10), timeouts_seen: vec![] }
	}

	pub fn reply<B: Into<Vec<u8>>>(mut self, cmd:&str, response:B) -> Self {
		self.replies.entry(cmd.to_owned()).or_default().push_back(Reply::Data(response.into()));
		self
	}

	pub fn fail(mut self, cmd:&str, msg:&str) -> Self {
		self.replies.entry(cmd.to_owned()).or_default().push_back(Reply::Fail(msg.to_owned()));
		self
	}

	pub fn sent(&self) -> &[String] { &self.sent }

	pub fn timeouts_seen(&self) -> &[Duration] { &self.timeouts_seen }

	fn no_reply(&self) -> Error {
		let last = self.sent.last().map(|s| s.as_str()).unwrap_or("");
		Error::Io(io::Error::new(io::ErrorKind::TimedOut, format!("no response to {:?}", last)))
	}

}

impl Default for ScriptedChannel {
	fn default() -> Self { Self::new() }
}

impl Channel for ScriptedChannel {

	fn write(&mut self, cmd:&str) -> Result<()> {
		self.sent.push(cmd.to_owned());
		self.pending = None;

		if let Some(queue) = self.replies.get_mut(cmd) {
			let reply = if queue.len() > 1 { queue.pop_front() } else { queue.front().cloned() };
			self.pending = match reply {
				Some(Reply::Data(data)) => Some(Ok(Pending{ data, pos: 0 })),
				Some(Reply::Fail(msg))  => Some(Err(msg)),
				None                    => None,
			};
		}
		Ok(())
	}

	fn read_raw(&mut self) -> Result<Vec<u8>> {
		match self.pending.take() {
			Some(Ok(p))    => Ok(p.data[p.pos..].to_vec()),
			Some(Err(msg)) => Err(Error::Io(io::Error::new(io::ErrorKind::Other, msg))),
			None           => Err(self.no_reply()),
		}
	}

	fn read_chunk(&mut self, max:usize) -> Result<ReadChunk> {
		match self.pending.take() {
			Some(Ok(mut p)) => {
				let end_pos = usize::min(p.pos + max, p.data.len());
				let data = p.data[p.pos..end_pos].to_vec();
				p.pos = end_pos;
				let end = p.pos == p.data.len();
				if !end { self.pending = Some(Ok(p)); }
				Ok(ReadChunk{ data, end })
			},
			Some(Err(msg)) => Err(Error::Io(io::Error::new(io::ErrorKind::Other, msg))),
			None           => Err(self.no_reply()),
		}
	}

	fn timeout(&self) -> Duration { self.timeout }

	fn set_timeout(&mut self, timeout:Duration) -> Result<()> {
		self.timeout = timeout;
		self.timeouts_seen.push(timeout);
		Ok(())
	}

}
