// Session configuration, loaded from TOML. Every field is optional:
//
// address = "192.168.1.20"
// io_timeout_ms = 10000
//
// [screenshot]
// chunk_size = 1024
// transfer_timeout_ms = 60000
// poll_initial_ms = 250
// poll_max_ms = 4000
// poll_factor = 2.0
// poll_attempts = 12

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::resource::{Resource, DEFAULT_DEVICE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
	pub address: Option<String>,
	pub device: String,
	pub io_timeout_ms: u64,
	pub screenshot: ScreenshotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
	pub chunk_size: usize,
	pub transfer_timeout_ms: u64,
	pub poll_initial_ms: u64,
	pub poll_max_ms: u64,
	pub poll_factor: f64,
	pub poll_attempts: u32,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			address: None,
			device: DEFAULT_DEVICE.to_owned(),
			io_timeout_ms: 10_000,
			screenshot: ScreenshotConfig::default(),
		}
	}
}

impl Default for ScreenshotConfig {
	fn default() -> Self {
		ScreenshotConfig {
			chunk_size: 1024,
			transfer_timeout_ms: 60_000,
			poll_initial_ms: 250,
			poll_max_ms: 4_000,
			poll_factor: 2.0,
			poll_attempts: 12,
		}
	}
}

impl ScreenshotConfig {

	pub fn validate(&self) -> Result<()> {
		if !(self.poll_factor.is_finite() && self.poll_factor > 0.0) {
			return Err(Error::InvalidArgument(format!("screenshot.poll_factor must be a positive number, got {}", self.poll_factor)));
		}
		if self.chunk_size == 0 {
			return Err(Error::InvalidArgument("screenshot.chunk_size must be at least 1".to_owned()));
		}
		Ok(())
	}

}

impl Config {

	pub fn load<P: AsRef<Path>>(path:P) -> Result<Self> {
		let text = fs::read_to_string(path)?;
		Self::from_toml(&text)
	}

	pub fn from_toml(text:&str) -> Result<Self> {
		let config:Config = toml::from_str(text)?;
		config.screenshot.validate()?;
		Ok(config)
	}

	pub fn io_timeout(&self) -> Duration { Duration::from_millis(self.io_timeout_ms) }

	// None when no address is configured
	pub fn resource(&self) -> Option<Resource> {
		self.address.as_ref().map(|addr| {
			let mut r = Resource::tcpip(addr);
			r.device = self.device.clone();
			r
		})
	}

}
