// Sweeps are saved twice: a CSV of Frequency,Real,Imaginary in Hz and an S2P file in GHz.
// The S2P carries one complex value per line, not the nine-column two-port layout, and its
// option line names the format actually written (RI or MA).
// Marker readings go to a sheet, xlsx or CSV depending on the file extension.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use csv::WriterBuilder;
use rust_xlsxwriter::Workbook;
use serde::Serialize;

use crate::devices::pnax::markers::MarkerReading;
use crate::devices::pnax::sweep::SweepSample;
use crate::error::Result;

pub const REFERENCE_IMPEDANCE_OHMS:f64 = 50.0;

const HZ_PER_GHZ:f64 = 1e9;

pub const SWEEP_CSV_HEADER:[&str; 3]  = ["Frequency", "Real", "Imaginary"];
pub const MARKER_CSV_HEADER:[&str; 4] = ["Marker", "Trace", "X", "Y"];

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum S2pFormat {
	RealImaginary,
	MagnitudeAngle,
}

impl S2pFormat {
	pub fn label(&self) -> &'static str { match self {
		S2pFormat::RealImaginary  => "RI",
		S2pFormat::MagnitudeAngle => "MA",
	}}
}

impl Default for S2pFormat {
	fn default() -> Self { S2pFormat::RealImaginary }
}

#[derive(Serialize)]
struct SweepRow {
	frequency: f64,
	real: f64,
	imaginary: f64,
}

// Option line, e.g. "# GHz S RI R 50"
pub fn s2p_header(format:S2pFormat, impedance_ohms:f64) -> String {
	format!("# GHz S {} R {}", format.label(), impedance_ohms)
}

pub fn write_sweep_csv<W: Write>(out:W, samples:&[SweepSample]) -> Result<()> {
	let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
	wtr.write_record(&SWEEP_CSV_HEADER)?;
	for s in samples {
		wtr.serialize(SweepRow{ frequency: s.frequency_hz, real: s.value.re, imaginary: s.value.im })?;
	}
	wtr.flush()?;
	Ok(())
}

pub fn write_s2p<W: Write>(mut out:W, samples:&[SweepSample], format:S2pFormat) -> Result<()> {
	writeln!(out, "{}", s2p_header(format, REFERENCE_IMPEDANCE_OHMS))?;
	for s in samples {
		let ghz = s.frequency_hz / HZ_PER_GHZ;
		match format {
			S2pFormat::RealImaginary  => writeln!(out, "{} {} {}", ghz, s.value.re, s.value.im)?,
			S2pFormat::MagnitudeAngle => writeln!(out, "{} {} {}", ghz, s.value.norm(), s.value.arg().to_degrees())?,
		}
	}
	out.flush()?;
	Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SheetFormat {
	Xlsx,
	Csv,
}

impl SheetFormat {
	// Anything other than .xlsx is written as CSV
	pub fn from_path<P: AsRef<Path>>(path:P) -> Self {
		match path.as_ref().extension().and_then(|e| e.to_str()) {
			Some(ext) if ext.eq_ignore_ascii_case("xlsx") => SheetFormat::Xlsx,
			_ => SheetFormat::Csv,
		}
	}
}

pub fn write_marker_csv<W: Write>(out:W, readings:&[MarkerReading]) -> Result<()> {
	let mut wtr = WriterBuilder::new().has_headers(false).from_writer(out);
	wtr.write_record(&MARKER_CSV_HEADER)?;
	for r in readings {
		wtr.serialize(r)?;
	}
	wtr.flush()?;
	Ok(())
}

// One worksheet, header in the first row, one row per reading
pub fn marker_workbook(readings:&[MarkerReading]) -> Result<Vec<u8>> {
	let mut workbook = Workbook::new();
	let sheet = workbook.add_worksheet();

	for (col, title) in MARKER_CSV_HEADER.iter().enumerate() {
		sheet.write_string(0, col as u16, *title)?;
	}
	for (i, r) in readings.iter().enumerate() {
		let row = (i + 1) as u32;
		sheet.write_number(row, 0, r.marker)?;
		sheet.write_number(row, 1, r.trace)?;
		sheet.write_number(row, 2, r.x)?;
		sheet.write_number(row, 3, r.y)?;
	}

	Ok(workbook.save_to_buffer()?)
}

pub fn save_sweep_csv<P: AsRef<Path>>(path:P, samples:&[SweepSample]) -> Result<()> {
	write_sweep_csv(BufWriter::new(File::create(path)?), samples)
}

pub fn save_s2p<P: AsRef<Path>>(path:P, samples:&[SweepSample], format:S2pFormat) -> Result<()> {
	write_s2p(BufWriter::new(File::create(path)?), samples, format)
}

pub fn save_marker_sheet<P: AsRef<Path>>(path:P, readings:&[MarkerReading]) -> Result<()> {
	match SheetFormat::from_path(&path) {
		SheetFormat::Xlsx => {
			let bytes = marker_workbook(readings)?;
			File::create(path)?.write_all(&bytes)?;
			Ok(())
		},
		SheetFormat::Csv => write_marker_csv(BufWriter::new(File::create(path)?), readings),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Cursor;

	use approx::assert_relative_eq;
	use calamine::{Data, Reader, Xlsx};
	use num_complex::Complex64;

	fn samples() -> Vec<SweepSample> {
		vec![
			SweepSample{ frequency_hz: 1e9,   value: Complex64::new(1.0, 2.0) },
			SweepSample{ frequency_hz: 5.5e9, value: Complex64::new(3.0, 4.0) },
			SweepSample{ frequency_hz: 10e9,  value: Complex64::new(5.0, 6.0) },
		]
	}

	#[test]
	fn s2p_header_is_stable() {
		assert_eq!(s2p_header(S2pFormat::RealImaginary, 50.0), "# GHz S RI R 50");
		assert_eq!(s2p_header(S2pFormat::MagnitudeAngle, 50.0), "# GHz S MA R 50");
		assert_eq!(s2p_header(S2pFormat::RealImaginary, 50.0), s2p_header(S2pFormat::RealImaginary, 50.0));
	}

	#[test]
	fn s2p_rows_are_in_ghz() {
		let mut buf = vec![];
		write_s2p(&mut buf, &samples(), S2pFormat::RealImaginary).unwrap();
		let text = String::from_utf8(buf).unwrap();
		assert_eq!(text, "# GHz S RI R 50\n1 1 2\n5.5 3 4\n10 5 6\n");
	}

	#[test]
	fn magnitude_angle_rows_convert_the_values() {
		let mut buf = vec![];
		let s = [SweepSample{ frequency_hz: 2e9, value: Complex64::new(3.0, 4.0) }];
		write_s2p(&mut buf, &s, S2pFormat::MagnitudeAngle).unwrap();
		let text = String::from_utf8(buf).unwrap();
		let mut lines = text.lines();
		assert_eq!(lines.next(), Some("# GHz S MA R 50"));
		let row:Vec<f64> = lines.next().unwrap().split(' ').map(|v| v.parse().unwrap()).collect();
		assert_eq!(row[0], 2.0);
		assert_relative_eq!(row[1], 5.0, max_relative = 1e-12);
		assert_relative_eq!(row[2], 53.13010235415598, max_relative = 1e-9);
	}

	#[test]
	fn sweep_csv_has_header_and_one_row_per_sample() {
		let mut buf = vec![];
		write_sweep_csv(&mut buf, &samples()).unwrap();
		let text = String::from_utf8(buf).unwrap();
		let lines:Vec<&str> = text.lines().collect();
		assert_eq!(lines.len(), 4);
		assert_eq!(lines[0], "Frequency,Real,Imaginary");
		assert_eq!(lines[2], "5500000000.0,3.0,4.0");
	}

	#[test]
	fn empty_marker_sheet_is_just_the_header() {
		let mut buf = vec![];
		write_marker_csv(&mut buf, &[]).unwrap();
		assert_eq!(String::from_utf8(buf).unwrap(), "Marker,Trace,X,Y\n");
	}

	fn read_back(bytes:Vec<u8>) -> Vec<Vec<Data>> {
		let mut wb:Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
		let range = wb.worksheet_range("Sheet1").unwrap();
		range.rows().map(|r| r.to_vec()).collect()
	}

	#[test]
	fn workbook_holds_header_and_readings() {
		let readings = [MarkerReading{ marker: 2, trace: 1, x: 2.5e9, y: -12.5 }];
		let rows = read_back(marker_workbook(&readings).unwrap());
		assert_eq!(rows.len(), 2);
		let header:Vec<Data> = MARKER_CSV_HEADER.iter().map(|h| Data::String(h.to_string())).collect();
		assert_eq!(rows[0], header);
		assert_eq!(rows[1], vec![Data::Float(2.0), Data::Float(1.0), Data::Float(2.5e9), Data::Float(-12.5)]);
	}

	#[test]
	fn empty_workbook_is_just_the_header() {
		let rows = read_back(marker_workbook(&[]).unwrap());
		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0][0], Data::String("Marker".to_owned()));
	}

	#[test]
	fn sheet_format_follows_the_extension() {
		assert_eq!(SheetFormat::from_path("markers.xlsx"), SheetFormat::Xlsx);
		assert_eq!(SheetFormat::from_path("out/MARKERS.XLSX"), SheetFormat::Xlsx);
		assert_eq!(SheetFormat::from_path("markers.csv"), SheetFormat::Csv);
		assert_eq!(SheetFormat::from_path("markers"), SheetFormat::Csv);
	}
}
