// Screenshots are saved on the analyzer's own disk first, then pulled over the link with
// MMEM:TRAN? in fixed-size chunks once the file shows up in the catalog.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::channel::{Channel, ReadChunk};
use crate::config::ScreenshotConfig;
use crate::error::{Error, Result};
use super::PNAX;

// Bounded exponential backoff for waiting on the instrument's file system
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
	pub initial_delay: Duration,
	pub max_delay: Duration,
	pub factor: f64,
	pub max_attempts: u32,
}

impl PollPolicy {

	// initial_delay, then growing by factor up to max_delay
	pub fn delays(&self) -> impl Iterator<Item = Duration> {
		let (initial, max) = (self.initial_delay, self.max_delay);
		let factor = if self.factor.is_finite() && self.factor >= 1.0 { self.factor } else { 1.0 };
		let mut next = initial;
		(0..self.max_attempts).map(move |_| {
			let ans = if next > max { max } else { next };
			next = if ans >= max { max } else {
				Duration::try_from_secs_f64(ans.as_secs_f64() * factor).map_or(max, |d| d.min(max))
			};
			ans
		})
	}

}

impl<'a> From<&'a ScreenshotConfig> for PollPolicy {
	fn from(c:&'a ScreenshotConfig) -> Self {
		PollPolicy {
			initial_delay: Duration::from_millis(c.poll_initial_ms),
			max_delay: Duration::from_millis(c.poll_max_ms),
			factor: c.poll_factor,
			max_attempts: c.poll_attempts,
		}
	}
}

// Pull chunks until one comes back short or flagged as the end of the message
pub fn assemble_chunks<F>(chunk_size:usize, mut next_chunk:F) -> Result<Vec<u8>>
	where F: FnMut(usize) -> Result<ReadChunk>
{
	let chunk_size = usize::max(chunk_size, 1);
	let mut ans:Vec<u8> = vec![];
	loop {
		let ReadChunk{ mut data, end } = next_chunk(chunk_size)?;
		let short = data.len() < chunk_size;
		ans.append(&mut data);
		if short || end { return Ok(ans); }
	}
}

// IEEE 488.2 block header (#<n><len> or #0) and trailing newline; anything else is left untouched
pub fn strip_block_header(buf:&[u8]) -> &[u8] {
	if buf.len() < 2 || buf[0] != b'#' || !buf[1].is_ascii_digit() { return buf; }

	let ndigits = (buf[1] - b'0') as usize;
	if ndigits == 0 {
		let body = &buf[2..];
		return body.strip_suffix(b"\n").unwrap_or(body);
	}

	let len = match buf.get(2..2 + ndigits)
		.and_then(|d| std::str::from_utf8(d).ok())
		.and_then(|d| d.parse::<usize>().ok())
	{
		Some(len) => len,
		None => return buf,
	};

	buf.get(2 + ndigits..2 + ndigits + len).unwrap_or(buf)
}

fn remote_path(instr_dir:&str, file_name:&str) -> String {
	format!("{}/{}", instr_dir.trim_end_matches(|c| c == '/' || c == '\\'), file_name)
}

impl<C: Channel> PNAX<C> {

	pub fn poll_policy(&self) -> PollPolicy { PollPolicy::from(&self.screenshot) }

	pub fn file_exists(&mut self, instr_dir:&str, file_name:&str) -> Result<bool> {
		let catalog = self.ask(&format!(":MMEM:CAT? '{}'", instr_dir))?;
		Ok(catalog.contains(file_name))
	}

	fn wait_for_file(&mut self, instr_dir:&str, file_name:&str) -> Result<()> {
		for (attempt, delay) in self.poll_policy().delays().enumerate() {
			thread::sleep(delay);
			if self.file_exists(instr_dir, file_name)? {
				debug!("{} present after {} catalog checks", file_name, attempt + 1);
				return Ok(());
			}
		}
		Err(Error::FileNotFound{ file: file_name.to_owned(), dir: instr_dir.to_owned() })
	}

	fn transfer(&mut self, remote:&str) -> Result<Vec<u8>> {
		let chunk_size = self.screenshot.chunk_size;
		self.send(&format!("MMEM:TRAN? '{}'", remote))?;
		let core = &mut self.core;
		assemble_chunks(chunk_size, |n| core.read_chunk(n))
	}

	// Saves to instr_dir/file_name on the instrument, copies to pc_dir/file_name
	pub fn save_screenshot<P: AsRef<Path>>(&mut self, file_name:&str, instr_dir:&str, pc_dir:P) -> Result<PathBuf> {
		let remote = remote_path(instr_dir, file_name);

		self.send(&format!(":MMEM:STOR:IMAG '{}'", remote))?;
		self.wait_for_file(instr_dir, file_name)?;

		let previous = self.timeout();
		self.set_timeout(Duration::from_millis(self.screenshot.transfer_timeout_ms))?;
		let transferred = self.transfer(&remote);
		if let Err(e) = self.set_timeout(previous) {
			warn!("Unable to restore the I/O timeout to {:?}: {}", previous, e);
		}

		let raw = transferred?;
		let image = strip_block_header(&raw);

		let local = pc_dir.as_ref().join(file_name);
		fs::write(&local, image)?;
		info!("Screenshot saved successfully at {} ({} bytes)", local.display(), image.len());
		Ok(local)
	}

	// Same as save_screenshot, failures are logged and dropped
	pub fn grab_screenshot<P: AsRef<Path>>(&mut self, file_name:&str, instr_dir:&str, pc_dir:P) -> Option<PathBuf> {
		match self.save_screenshot(file_name, instr_dir, pc_dir) {
			Ok(path) => Some(path),
			Err(e) => {
				error!("An error occurred while grabbing screenshot {}: {}", file_name, e);
				None
			}
		}
	}

}
