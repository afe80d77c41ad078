//! Remote GATT characteristic handles over an event-driven Bluetooth LE
//! transport.
//!
//! The [`host::Transport`] performs radio I/O and reports every result later,
//! as an [`Event`] keyed only by characteristic identity. A [`Characteristic`]
//! correlates those events with its outstanding requests. Each request kind
//! has its own FIFO queue, so a reply always completes the oldest request of
//! its kind. Value notifications share the read event channel, but they never
//! complete a read. They go to persistent value listeners instead.

#![warn(missing_debug_implementations)]
#![warn(non_ascii_idents)]
#![warn(single_use_lifetimes)]
#![warn(unused_crate_dependencies)]
#![warn(unused_extern_crates)]
#![warn(unused_import_braces)]
#![warn(unused_lifetimes)]
#![warn(unused_qualifications)]
#![warn(clippy::nursery)]
#![warn(clippy::pedantic)]
#![allow(clippy::inline_always)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![warn(clippy::clone_on_ref_ptr)]
#![warn(clippy::dbg_macro)]
#![warn(clippy::empty_structs_with_brackets)]
#![warn(clippy::get_unwrap)]
#![warn(clippy::mod_module_files)]
#![warn(clippy::print_stdout)]
#![warn(clippy::str_to_string)]
#![warn(clippy::todo)]
#![warn(clippy::try_err)]
#![warn(clippy::unseparated_literal_suffix)]

pub use gattc_const::{Info, Table, Uuid};
pub use {characteristic::*, event::ListenerId};
pub use host::{Descriptor, Event, EventKind, Handle, Key, Transport, Value};

mod characteristic;
mod event;
pub mod host;

// Used by the heart_rate demo
#[cfg(test)]
use {anyhow as _, clap as _, tracing_subscriber as _};
