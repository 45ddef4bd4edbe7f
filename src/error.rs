// One error type for every layer: transport failures (Io, Rpc, Device, NotConnected),
// unusable answers or input (Parse, Utf8, UnexpectedResponse, ...), and FileNotFound
// for a screenshot that never shows up on the instrument.

use std::io;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
	#[error("I/O error: {0}")]
	Io(#[from] io::Error),

	#[error("RPC error: {0}")]
	Rpc(String),

	#[error("{call} failed with VXI-11 error {code}: {}", device_error_text(.code))]
	Device { call: &'static str, code: i32 },

	#[error("No link to the instrument")]
	NotConnected,

	#[error("Unable to parse token {index} ({token:?}) as a number")]
	Parse { index: usize, token: String },

	#[error("Unable to interpret {0} response as UTF-8")]
	Utf8(String),

	#[error("Unexpected response to {query}: {response:?}")]
	UnexpectedResponse { query: String, response: String },

	#[error("Expected interleaved real/imaginary values but got an odd count ({0})")]
	OddSampleCount(usize),

	#[error("Expected {expected} samples but the instrument returned {actual}")]
	SampleCount { expected: usize, actual: usize },

	#[error("The file {file} was not found in the directory {dir} on the instrument")]
	FileNotFound { file: String, dir: String },

	#[error("Invalid argument: {0}")]
	InvalidArgument(String),

	#[error("Invalid resource string {0:?}")]
	Resource(String),

	#[error("CSV error: {0}")]
	Csv(#[from] csv::Error),

	#[error("Configuration error: {0}")]
	Config(#[from] toml::de::Error),

	#[error("Spreadsheet error: {0}")]
	Xlsx(#[from] rust_xlsxwriter::XlsxError),
}

// device_error codes from VXI-11 B.5.1
pub fn device_error_text(code: &i32) -> &'static str {
	match *code {
		1  => "syntax error",
		3  => "device not accessible",
		4  => "invalid link identifier",
		5  => "parameter error",
		6  => "channel not established",
		8  => "operation not supported",
		9  => "out of resources",
		11 => "device locked by another link",
		12 => "no lock held by this link",
		15 => "I/O timeout",
		17 => "I/O error",
		21 => "invalid address",
		23 => "abort",
		29 => "channel already established",
		_  => "unknown error",
	}
}

pub(crate) fn rpc_err(msg: &str) -> Error { Error::Rpc(msg.to_owned()) }
