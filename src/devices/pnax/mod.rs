
use std::time::Duration;

use lazy_static::lazy_static;
use log::{debug, info};
use regex::Regex;
use serde::{Serialize, Deserialize};

use crate::channel::Channel;
use crate::config::{Config, ScreenshotConfig};
use crate::error::{Error, Result};
use crate::resource::Resource;
use crate::vxi11::CoreClient;

use self::sweep::parse_values;

pub mod markers;
pub mod screenshot;
pub mod sweep;

lazy_static! {
	static ref IDN_RE: Regex = Regex::new("([^,]+),([^,]+),([^,]+),([^,\\s]+)").unwrap();
}

pub struct PNAX<C: Channel = CoreClient> {
	core: C,
	measurements: Vec<String>,
	screenshot: ScreenshotConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
	pub manufacturer: String,
	pub model: String,
	pub serial_num: String,
	pub fw_version: String,
}

impl Identity {
	pub fn parse(idn:&str) -> Result<Self> {
		let unexpected = || Error::UnexpectedResponse{ query: "*IDN?".to_owned(), response: idn.to_owned() };
		let caps = IDN_RE.captures(idn).ok_or_else(unexpected)?;
		let field = |i:usize| caps.get(i).map(|m| m.as_str().trim().to_owned()).ok_or_else(unexpected);
		Ok(Identity{ manufacturer: field(1)?, model: field(2)?, serial_num: field(3)?, fw_version: field(4)? })
	}
}

impl PNAX<CoreClient> {

	pub fn new(addr:&str) -> Result<Self> {
		Self::open(&Resource::tcpip(addr), &Config::default())
	}

	pub fn connect(config:&Config) -> Result<Self> {
		let resource = config.resource().ok_or_else(|| Error::InvalidArgument("no instrument address configured".to_owned()))?;
		Self::open(&resource, config)
	}

	pub fn open(resource:&Resource, config:&Config) -> Result<Self> {
		let mut core = CoreClient::open(resource)?;
		core.set_timeout(config.io_timeout())?;
		info!("Connected on {}", resource);
		Ok(Self::with_channel(core).with_screenshot_config(config.screenshot.clone()))
	}

	pub fn disconnect(mut self) -> Result<()> {
		self.core.destroy_link()
	}

}

impl<C: Channel> PNAX<C> {

	pub fn with_channel(core:C) -> Self {
		PNAX{ core, measurements: vec![], screenshot: ScreenshotConfig::default() }
	}

	pub fn with_screenshot_config(mut self, screenshot:ScreenshotConfig) -> Self {
		self.screenshot = screenshot;
		self
	}

	pub fn channel(&self) -> &C { &self.core }

	pub fn into_channel(self) -> C { self.core }

	// Names defined with CALC:PAR:DEF since the last reset or clear
	pub fn measurements(&self) -> &[String] { &self.measurements }

	pub(crate) fn send(&mut self, cmd:&str) -> Result<()> {
		debug!("-> {}", cmd);
		self.core.write(cmd)
	}

	pub(crate) fn ask(&mut self, cmd:&str) -> Result<String> {
		debug!("-> {}", cmd);
		let ans = self.core.query(cmd)?;
		debug!("<- {}", ans);
		Ok(ans)
	}

	// First value of a numeric response; marker Y readouts carry a second, unused value
	fn ask_f64(&mut self, cmd:&str) -> Result<f64> {
		let res = self.ask(cmd)?;
		parse_values(&res)?.first().copied().ok_or(Error::UnexpectedResponse{ query: cmd.to_owned(), response: res })
	}

	pub fn identify(&mut self) -> Result<Identity> {
		let idn = self.ask("*IDN?")?;
		Identity::parse(&idn)
	}

	pub fn print_id(&mut self) -> Result<Identity> {
		let idn = self.ask("*IDN?")?;
		println!("{}", idn);
		Identity::parse(&idn)
	}

	// Clears all the measurements present on the window
	pub fn clear_measurements(&mut self) -> Result<()> {
		self.send("CALC:PAR:DEL:ALL")?;
		self.measurements.clear();
		Ok(())
	}

	pub(crate) fn define_measurement(&mut self, name:&str, parameter:&str) -> Result<()> {
		self.send(&format!("CALC:PAR:DEF '{}',{}", name, parameter))?;
		self.send(&format!("DISP:WIND:TRAC:FEED '{}'", name))?;
		self.measurements.push(name.to_owned());
		Ok(())
	}

	pub fn pna_reset(&mut self) -> Result<()> {
		self.send(":SYST:FPReset")?;
		self.measurements.clear();
		Ok(())
	}

	pub fn set_channel_freq(&mut self, start_hz:f64, stop_hz:f64, center_hz:f64, span_hz:f64, cw_hz:f64) -> Result<()> {
		self.send(&format!("SENS:FREQ:STAR {}", start_hz))?;
		self.send(&format!("SENS:FREQ:STOP {}", stop_hz))?;
		self.send(&format!("SENS:FREQ:CENT {}", center_hz))?;
		self.send(&format!("SENS:FREQ:SPAN {}", span_hz))?;
		self.send(&format!("SENS:FREQ:CW {}", cw_hz))
	}

	// One-liners
	pub fn channel_power_on(&mut self)  -> Result<()> { self.send("OUTP ON")  }
	pub fn channel_power_off(&mut self) -> Result<()> { self.send("OUTP OFF") }
	pub fn set_power(&mut self, dbm:f64) -> Result<()> { self.send(&format!("SOUR:POW1 {}", dbm)) }

	pub fn query_freq_start(&mut self) -> Result<f64> { self.ask_f64("SENS:FREQ:STAR?") }
	pub fn query_freq_stop(&mut self)  -> Result<f64> { self.ask_f64("SENS:FREQ:STOP?") }

	// Marker 1 to the peak after a fresh sweep, returns (X, Y). false just hides the readout.
	pub fn set_marker(&mut self, trigger:bool) -> Result<Option<(f64, f64)>> {
		if !trigger {
			self.send("DISP:WIND:ANN:MARK:STAT OFF")?;
			return Ok(None);
		}

		self.send("DISP:WIND:ANN:MARK:STAT ON")?;
		self.send("CALC1:MARK1:STAT ON")?;
		self.sweep_and_wait()?;
		self.send("CALC1:MARK1:FUNC:EXEC MAX")?;
		let y = self.ask_f64(":CALC1:MARK1:Y?")?;
		let x = self.ask_f64(":CALC1:MARK1:X?")?;
		Ok(Some((x, y)))
	}

	pub fn marker(&mut self, x:f64, y:f64) -> Result<()> {
		self.send("CALC:MARK:ON")?;
		self.send(&format!("CALC:MARK:X {}", x))?;
		self.send(&format!("CALC:MARK:Y {}", y))
	}

	// Trigger one sweep and block until the instrument reports it complete
	pub(crate) fn sweep_and_wait(&mut self) -> Result<()> {
		self.send("INIT:IMM;*WAI")?;
		match self.ask("*OPC?")?.trim().trim_start_matches('+') {
			"1" => Ok(()),
			other => Err(Error::UnexpectedResponse{ query: "*OPC?".to_owned(), response: other.to_owned() }),
		}
	}

	pub(crate) fn timeout(&self) -> Duration { self.core.timeout() }

	pub(crate) fn set_timeout(&mut self, timeout:Duration) -> Result<()> { self.core.set_timeout(timeout) }

}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::channel::ScriptedChannel;

	#[test]
	fn identity_is_split_into_fields() {
		let id = Identity::parse("Keysight Technologies,N5247B,MY12345678,A.13.95.09\n").unwrap();
		assert_eq!(id.manufacturer, "Keysight Technologies");
		assert_eq!(id.model, "N5247B");
		assert_eq!(id.serial_num, "MY12345678");
		assert_eq!(id.fw_version, "A.13.95.09");
	}

	#[test]
	fn garbage_identity_is_rejected() {
		assert!(Identity::parse("hello").is_err());
	}

	#[test]
	fn channel_frequencies_go_out_in_order() {
		let mut pna = PNAX::with_channel(ScriptedChannel::new());
		pna.set_channel_freq(1e9, 2e9, 1.5e9, 1e9, 1.2e9).unwrap();
		assert_eq!(pna.channel().sent(), &[
			"SENS:FREQ:STAR 1000000000", "SENS:FREQ:STOP 2000000000", "SENS:FREQ:CENT 1500000000",
			"SENS:FREQ:SPAN 1000000000", "SENS:FREQ:CW 1200000000",
		]);
	}

	#[test]
	fn measurements_are_tracked_until_cleared() {
		let mut pna = PNAX::with_channel(ScriptedChannel::new());
		pna.define_measurement("Meas1", "S21").unwrap();
		assert_eq!(pna.measurements(), &["Meas1".to_owned()]);
		pna.clear_measurements().unwrap();
		assert!(pna.measurements().is_empty());
		assert_eq!(pna.channel().sent().last().map(|s| s.as_str()), Some("CALC:PAR:DEL:ALL"));
	}

	#[test]
	fn frequency_queries_parse_the_response() {
		let ch = ScriptedChannel::new()
			.reply("SENS:FREQ:STAR?", "+1.00000000000E+009\n")
			.reply("SENS:FREQ:STOP?", "garbage");
		let mut pna = PNAX::with_channel(ch);
		assert_eq!(pna.query_freq_start().unwrap(), 1e9);
		assert!(pna.query_freq_stop().is_err());
	}

	#[test]
	fn peak_marker_reports_x_and_y() {
		let ch = ScriptedChannel::new()
			.reply("*OPC?", "+1")
			.reply(":CALC1:MARK1:Y?", "-3.25,0")
			.reply(":CALC1:MARK1:X?", "2.4E9");
		let mut pna = PNAX::with_channel(ch);
		assert_eq!(pna.set_marker(true).unwrap(), Some((2.4e9, -3.25)));
		assert_eq!(pna.set_marker(false).unwrap(), None);
		assert_eq!(pna.channel().sent().last().map(|s| s.as_str()), Some("DISP:WIND:ANN:MARK:STAT OFF"));
	}

	#[test]
	fn sweep_wait_rejects_unexpected_completion_reply() {
		let mut pna = PNAX::with_channel(ScriptedChannel::new().reply("*OPC?", "0"));
		assert!(pna.sweep_and_wait().is_err());
	}
}
