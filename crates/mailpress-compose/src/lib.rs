//! # mailpress-compose
//!
//! Message model and EML import for mailpress.
//!
//! ## Features
//!
//! - **Message model**: [`Msg`] with address headers, a fixed set of generic
//!   headers, date, charset, transfer encoding and a decoded text body
//! - **EML import**: [`EmlImporter`] fills a [`Msg`] from a raw RFC 5322
//!   message and reports partial results on failure
//!
//! ## Quick Start
//!
//! ```no_run
//! use mailpress_compose::{Header, eml};
//!
//! match eml::from_file("message.eml") {
//!     Ok(msg) => println!("subject: {:?}", msg.get_gen_header(Header::Subject)),
//!     Err(partial) => {
//!         eprintln!("import failed: {}", partial.error);
//!         println!("recovered from: {:?}", partial.message.get_from());
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod eml;
mod error;
mod msg;

pub use clock::{Clock, FixedClock, SystemClock};
pub use eml::EmlImporter;
pub use error::{Error, PartialImport, Result};
pub use msg::{AddrHeader, Body, Charset, Header, Msg};
