//! Bluetooth Module
//!
//! Manages Bluetooth devices by driving the external `bluetoothctl` tool
//! (with `rfkill` as a fallback status source) and parsing its output.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    BluetoothService                      │
//! │  (Main coordinator - public API for the application)     │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐
//! │  Scanner  │  │  Command   │  │  Parser  │
//! │           │  │            │  │          │
//! │ - live    │  │ - one-shot │  │ - info   │
//! │   session │  │   runs     │  │   blocks │
//! │ - dedup   │  │ - exit     │  │ - scan   │
//! │ - enrich  │  │   mapping  │  │   lines  │
//! └───────────┘  └────────────┘  └──────────┘
//! ```
//!
//! ## Modules
//!
//! - [`command`] - One-shot execution of the external tools
//! - [`parser`] - Pure parsers for the tools' textual output
//! - [`scanner`] - Interactive discovery session over a long-lived process
//! - [`service`] - Main service coordinator

pub mod command;
pub mod parser;
pub mod scanner;
pub mod service;

// Re-export main service for convenience
pub use service::BluetoothService;
