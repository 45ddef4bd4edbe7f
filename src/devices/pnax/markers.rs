
use std::ops::RangeInclusive;
use std::path::Path;

use log::{info, warn};
use serde::{Serialize, Deserialize};

use crate::channel::Channel;
use crate::error::{Error, Result};
use crate::export;
use super::PNAX;
use super::sweep::parse_values;

pub const MARKER_SLOTS:RangeInclusive<u8> = 1..=10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerReading {
	pub marker: u8,
	pub trace: u32,
	pub x: f64,
	pub y: f64,
}

#[derive(Debug)]
pub enum MarkerProbe {
	Present(Vec<MarkerReading>),
	// Marker not switched on for this trace
	Absent,
	Failed(Error),
}

fn parse_state(query:&str, res:&str) -> Result<bool> {
	match res.trim().trim_start_matches('+').to_ascii_uppercase().as_str() {
		"1" | "ON"  => Ok(true),
		"0" | "OFF" => Ok(false),
		_ => Err(Error::UnexpectedResponse{ query: query.to_owned(), response: res.to_owned() }),
	}
}

impl<C: Channel> PNAX<C> {

	fn read_marker(&mut self, trace:u32, marker:u8) -> Result<Option<Vec<MarkerReading>>> {
		self.send(&format!("CALC{}:PAR:SEL", trace))?;

		let state_query = format!("CALC{}:MARK{}:STAT?", trace, marker);
		let state = self.ask(&state_query)?;
		if !parse_state(&state_query, &state)? { return Ok(None); }

		let xs = parse_values(&self.ask(&format!("CALC{}:MARK{}:X?", trace, marker))?)?;
		let ys = parse_values(&self.ask(&format!("CALC{}:MARK{}:Y?", trace, marker))?)?;

		Ok(Some(xs.into_iter().zip(ys).map(|(x, y)| MarkerReading{ marker, trace, x, y }).collect()))
	}

	pub fn probe_marker(&mut self, trace:u32, marker:u8) -> MarkerProbe {
		match self.read_marker(trace, marker) {
			Ok(Some(readings)) => MarkerProbe::Present(readings),
			Ok(None)           => MarkerProbe::Absent,
			Err(e)             => MarkerProbe::Failed(e),
		}
	}

	// Slots that fail to answer are logged and left out
	pub fn collect_markers(&mut self, trace:u32) -> Vec<MarkerReading> {
		let mut ans:Vec<MarkerReading> = vec![];
		for marker in MARKER_SLOTS {
			match self.probe_marker(trace, marker) {
				MarkerProbe::Present(mut readings) => ans.append(&mut readings),
				MarkerProbe::Absent => {},
				MarkerProbe::Failed(e) => warn!("Skipping marker {} on trace {}: {}", marker, trace, e),
			}
		}
		ans
	}

	pub fn get_all_marker_data<P: AsRef<Path>>(&mut self, file_name:P, trace:u32) -> Result<Vec<MarkerReading>> {
		let readings = self.collect_markers(trace);
		export::save_marker_sheet(&file_name, &readings)?;
		info!("Wrote {} marker readings to {}", readings.len(), file_name.as_ref().display());
		Ok(readings)
	}

}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::channel::ScriptedChannel;

	#[test]
	fn inactive_marker_is_absent_not_failed() {
		let ch = ScriptedChannel::new().reply("CALC1:MARK3:STAT?", "0");
		let mut pna = PNAX::with_channel(ch);
		assert!(matches!(pna.probe_marker(1, 3), MarkerProbe::Absent));
	}

	#[test]
	fn unanswered_marker_is_failed() {
		let mut pna = PNAX::with_channel(ScriptedChannel::new());
		assert!(matches!(pna.probe_marker(1, 3), MarkerProbe::Failed(_)));
	}

	#[test]
	fn active_marker_zips_x_and_y() {
		let ch = ScriptedChannel::new()
			.reply("CALC2:MARK1:STAT?", "1")
			.reply("CALC2:MARK1:X?", "1E9,2E9")
			.reply("CALC2:MARK1:Y?", "-3.5,-4.5,0");
		let mut pna = PNAX::with_channel(ch);
		match pna.probe_marker(2, 1) {
			MarkerProbe::Present(r) => assert_eq!(r, vec![
				MarkerReading{ marker: 1, trace: 2, x: 1e9, y: -3.5 },
				MarkerReading{ marker: 1, trace: 2, x: 2e9, y: -4.5 },
			]),
			other => panic!("expected readings, got {:?}", other),
		}
	}

	#[test]
	fn malformed_marker_value_is_failed() {
		let ch = ScriptedChannel::new()
			.reply("CALC1:MARK1:STAT?", "1")
			.reply("CALC1:MARK1:X?", "1E9")
			.reply("CALC1:MARK1:Y?", "oops");
		let mut pna = PNAX::with_channel(ch);
		assert!(matches!(pna.probe_marker(1, 1), MarkerProbe::Failed(Error::Parse{ .. })));
	}

	#[test]
	fn state_accepts_numeric_and_word_forms() {
		assert!(parse_state("q", "+1\n").unwrap());
		assert!(parse_state("q", "on").unwrap());
		assert!(!parse_state("q", "OFF").unwrap());
		assert!(parse_state("q", "maybe").is_err());
	}
}
