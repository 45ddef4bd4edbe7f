// CALC:DATA? SDATA answers re0,im0,re1,im1,... with no stimulus values, so the frequency
// of each point is rebuilt from the requested start, stop and point count.

use std::path::PathBuf;

use log::info;
use num_complex::Complex64;

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::export::{self, S2pFormat};
use super::PNAX;

pub const MEASUREMENT_NAME:&str = "Meas1";
pub const DEFAULT_CSV_PATH:&str = "sparam_data.csv";
pub const DEFAULT_S2P_PATH:&str = "sparam_data.s2p";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepSample {
	pub frequency_hz: f64,
	pub value: Complex64,
}

#[derive(Debug, Clone)]
pub struct SweepRequest {
	// S11, S21, ...
	pub parameter: String,
	pub start_hz: f64,
	pub stop_hz: f64,
	pub points: usize,
	pub csv_path: PathBuf,
	pub s2p_path: PathBuf,
	pub s2p_format: S2pFormat,
}

impl SweepRequest {

	pub fn new(parameter:&str, start_hz:f64, stop_hz:f64, points:usize) -> Self {
		SweepRequest {
			parameter: parameter.to_owned(),
			start_hz,
			stop_hz,
			points,
			csv_path: PathBuf::from(DEFAULT_CSV_PATH),
			s2p_path: PathBuf::from(DEFAULT_S2P_PATH),
			s2p_format: S2pFormat::default(),
		}
	}

	pub fn with_outputs<P: Into<PathBuf>, Q: Into<PathBuf>>(mut self, csv_path:P, s2p_path:Q) -> Self {
		self.csv_path = csv_path.into();
		self.s2p_path = s2p_path.into();
		self
	}

	pub fn with_s2p_format(mut self, format:S2pFormat) -> Self {
		self.s2p_format = format;
		self
	}

	fn validate(&self) -> Result<()> {
		if self.points == 0 {
			return Err(Error::InvalidArgument("a sweep needs at least one point".to_owned()));
		}
		if !self.start_hz.is_finite() || !self.stop_hz.is_finite() {
			return Err(Error::InvalidArgument(format!("sweep span {}..{} is not finite", self.start_hz, self.stop_hz)));
		}
		if self.parameter.trim().is_empty() {
			return Err(Error::InvalidArgument("empty measurement parameter".to_owned()));
		}
		Ok(())
	}

}

// Both ends included
pub fn linspace(start:f64, stop:f64, n:usize) -> Vec<f64> {
	match n {
		0 => vec![],
		1 => vec![start],
		_ => {
			let step = (stop - start) / ((n - 1) as f64);
			let mut ans:Vec<f64> = (0..n).map(|i| start + step * (i as f64)).collect();
			// Pin the end so rounding in the step can't move it
			ans[n - 1] = stop;
			ans
		}
	}
}

pub fn parse_values(response:&str) -> Result<Vec<f64>> {
	let response = response.trim();
	if response.is_empty() { return Ok(vec![]); }

	response.split(',')
		.enumerate()
		.map(|(index, token)| token.trim().parse::<f64>().map_err(|_| Error::Parse{ index, token: token.to_owned() }))
		.collect()
}

pub fn deinterleave(values:&[f64]) -> Result<Vec<Complex64>> {
	if values.len() % 2 != 0 { return Err(Error::OddSampleCount(values.len())); }
	Ok(values.chunks_exact(2).map(|pair| Complex64::new(pair[0], pair[1])).collect())
}

pub fn build_samples(start_hz:f64, stop_hz:f64, points:usize, response:&str) -> Result<Vec<SweepSample>> {
	let values = deinterleave(&parse_values(response)?)?;
	if values.len() != points {
		return Err(Error::SampleCount{ expected: points, actual: values.len() });
	}

	Ok(linspace(start_hz, stop_hz, points).into_iter()
		.zip(values)
		.map(|(frequency_hz, value)| SweepSample{ frequency_hz, value })
		.collect())
}

impl<C: Channel> PNAX<C> {

	// Resets the analyzer first. Files written before a later failure are left in place.
	pub fn get_data_output(&mut self, req:&SweepRequest) -> Result<Vec<SweepSample>> {
		req.validate()?;

		self.send("*RST")?;
		self.send("SYST:PRES")?;
		self.measurements.clear();
		self.define_measurement(MEASUREMENT_NAME, &req.parameter)?;

		self.send(&format!("SENS:FREQ:STAR {}", req.start_hz))?;
		self.send(&format!("SENS:FREQ:STOP {}", req.stop_hz))?;
		self.send(&format!("SENS:SWE:POIN {}", req.points))?;

		self.sweep_and_wait()?;

		self.send("FORM:DATA ASC")?;
		let sdata = self.ask("CALC:DATA? SDATA")?;
		let samples = build_samples(req.start_hz, req.stop_hz, req.points, &sdata)?;

		export::save_sweep_csv(&req.csv_path, &samples)?;
		export::save_s2p(&req.s2p_path, &samples, req.s2p_format)?;
		info!("Wrote {} points to {} and {}", samples.len(), req.csv_path.display(), req.s2p_path.display());

		Ok(samples)
	}

}
