//! # mailpress-mime
//!
//! MIME text transforms for email composition.
//!
//! ## Features
//!
//! - **Line wrapping**: [`LineBreaker`] re-chunks a base64 stream into
//!   76 column CRLF lines (RFC 2045 §6.8)
//! - **Transfer decoding**: Base64 and Quoted-Printable body decoding
//! - **RFC 5322 reading**: header block / body split with folded headers
//! - **Addresses**: mailbox and address-list parsing
//! - **Content types**: `type/subtype; param=value` parsing
//!
//! ## Quick Start
//!
//! ### Wrapping Base64 output
//!
//! ```
//! use std::io::Write;
//! use mailpress_mime::encoding::base64_writer;
//!
//! let mut encoder = base64_writer(Vec::new());
//! encoder.write_all(&[0u8; 120])?;
//! let mut breaker = encoder.finish()?;
//! breaker.close()?;
//!
//! let wire = breaker.into_inner().unwrap_or_default();
//! assert!(wire.split(|b| *b == b'\n').all(|line| line.len() <= 77));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ### Reading a raw message
//!
//! ```
//! use mailpress_mime::{ContentType, RawMessage};
//!
//! let raw = b"Content-Type: text/plain; charset=utf-8\r\n\r\nHello";
//! let message = RawMessage::parse(raw)?;
//! let content_type = ContentType::parse(message.headers.get("content-type").unwrap_or_default())?;
//! assert_eq!(content_type.charset(), Some("utf-8"));
//! # Ok::<(), mailpress_mime::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod content_type;
mod date;
mod error;
mod header;
mod linebreak;
mod message;

pub mod encoding;

pub use address::{Address, Mailbox, parse_address_list};
pub use content_type::ContentType;
pub use date::parse_date;
pub use error::{Error, FlushStage, Result};
pub use header::Headers;
pub use linebreak::{CRLF, LINE_WIDTH, LineBreaker};
pub use message::{RawMessage, TransferEncoding};
