
// Keysight PNA-X vector network analyzer.  Should also work for the PNA and PNA-L families since they share the SCPI tree
pub mod pnax;
