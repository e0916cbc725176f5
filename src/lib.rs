#![no_std]

//! An encoder, decoder and merger for Garmin's Flexible and Interoperable Data
//! Transfer protocol.
//!
//! Cassette decodes files into [`Message`]s whose layout is declared by the
//! file itself, resolves developer fields against the field descriptions seen
//! earlier in the same file, and encodes and merges files with recomputed
//! headers and CRCs.
//!
//! Most users should begin with the functions, types and derive macros in the
//! [`avec`] module. Common messages are provided by the [`profile`] module. If
//! these prove insufficient, consider driving the state machine described in
//! the [`sans`] module directly.
//!
//! ## Cargo Features
//!
//! The following crate feature flags are available:
//!
//! - `derive`: export derive macros (default).
//! - `std`: enable reader-based decoder (default).

extern crate alloc;
#[cfg(any(feature = "std", test))]
extern crate std;

// Lets derived implementations inside this crate name it by path.
extern crate self as cassette;

pub mod avec;
pub mod error;
pub mod message;
pub mod profile;
pub mod registry;
pub mod sans;

pub use error::Error;
pub use message::{DeveloperValue, Message};
pub use registry::{Handler, Registry};
