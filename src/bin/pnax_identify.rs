
use std::path::PathBuf;
use std::process;

use clap::Parser;
use log::{error, info};

use pnax::config::Config;
use pnax::resource::Resource;
use pnax::PNAX;

/// Connect to a PNA-X and print its identification
#[derive(Parser, Debug)]
#[command(name = "pnax_identify")]
struct Args {
	/// Instrument host or full TCPIP resource string
	#[arg(env = "PNAX_ADDRESS")]
	address: Option<String>,

	/// TOML configuration file
	#[arg(long)]
	config: Option<PathBuf>,
}

// A bare host goes through the configured device, a resource string is taken as is
fn resolve(address:Option<String>, config:&mut Config) -> pnax::Result<Resource> {
	if let Some(addr) = address { config.address = Some(addr); }
	match config.address.as_deref() {
		Some(addr) if addr.contains("::") => addr.parse::<Resource>(),
		_ => config.resource().ok_or_else(|| pnax::Error::InvalidArgument("no address given and PNAX_ADDRESS is not set".to_owned())),
	}
}

pub fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let args = Args::parse();

	let mut config = match &args.config {
		Some(path) => match Config::load(path) {
			Ok(c) => c,
			Err(e) => { error!("Unable to load {}: {}", path.display(), e); process::exit(1); }
		},
		None => Config::default(),
	};

	let resource = match resolve(args.address, &mut config) {
		Ok(r) => r,
		Err(e) => { error!("{}", e); process::exit(2); }
	};

	let mut pna = match PNAX::open(&resource, &config) {
		Ok(pna) => pna,
		Err(e) => { error!("Unable to connect to {}: {}", resource, e); process::exit(1); }
	};

	match pna.print_id() {
		Ok(id) => match serde_json::to_string_pretty(&id) {
			Ok(json) => println!("{}", json),
			Err(e) => error!("Unable to serialize identity: {}", e),
		},
		Err(e) => error!("Identification failed: {}", e),
	}

	if let Err(e) = pna.disconnect() {
		error!("Unable to close the link cleanly: {}", e);
		process::exit(1);
	}
	info!("Disconnected from {}", resource);
}
