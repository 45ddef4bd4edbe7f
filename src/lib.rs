
// External data representation, a protocol for serializing data to be sent over the network
pub mod xdr;

// Remote procedure call, a protocol build on top of XDR to provide something like C-style function calls over the network
pub mod rpc;

// A protocol using RPC that's meant to communicate with instruments like network analyzers, oscilloscopes, power supplies, etc
pub mod vxi11;

// The command/response seam drivers talk through, plus a scripted loopback for running them without hardware
pub mod channel;

// VISA-style resource strings like TCPIP0::192.168.1.20::inst0::INSTR
pub mod resource;

pub mod config;
pub mod error;

// CSV, S2P and marker sheet writers
pub mod export;

// Instrument drivers built on top of a channel
pub mod devices;

pub use error::{Error, Result};
pub use devices::pnax::PNAX;
