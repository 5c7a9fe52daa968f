//! relaymail builds MIME messages and submits them over SMTP.
//!
//! The crate has three layers:
//!
//! * [`encoder`]: streaming `base64`, `quoted-printable` and 8bit codecs,
//!   correct across arbitrary chunk boundaries, with line folding and
//!   dot-stuffing
//! * [`message`]: a typed message builder and the [`MimeWriter`](message::MimeWriter)
//!   turning a tree of MIME entities into wire bytes
//! * [`transport::smtp`]: an SMTP client driving greeting, `EHLO`/`HELO`,
//!   `STARTTLS`, authentication and the `MAIL`/`RCPT`/`DATA` transaction,
//!   reporting rejected recipients individually
//!
//! ## Features
//!
//! * **builder** (default): message builder
//! * **smtp-transport** (default): SMTP transport
//! * **native-tls** (default): TLS through the system library
//! * **hostname** (default): use the machine name in `EHLO` and `Message-ID`
//! * **tracing**: log SMTP exchanges with [`tracing`](https://docs.rs/tracing)
//! * **serde**: serialization of addresses
//!
//! ## Example
//!
//! ```rust,no_run
//! # #[cfg(all(feature = "builder", feature = "smtp-transport", feature = "native-tls"))]
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! use relaymail::{
//!     message::header::ContentType, transport::smtp::authentication::Credentials, Message,
//!     SmtpTransport, Transport,
//! };
//!
//! let email = Message::builder()
//!     .from("NoBody <nobody@domain.tld>".parse()?)
//!     .reply_to("Yuin <yuin@domain.tld>".parse()?)
//!     .to("Hei <hei@domain.tld>".parse()?)
//!     .subject("Happy new year")
//!     .header(ContentType::TEXT_PLAIN)
//!     .body(String::from("Be happy!"))?;
//!
//! let creds = Credentials::new("smtp_username".to_owned(), "smtp_password".to_owned());
//!
//! // Open a remote connection to the relay, upgraded with STARTTLS
//! let mailer = SmtpTransport::starttls_relay("smtp.domain.tld")?
//!     .credentials(creds)
//!     .build();
//!
//! match mailer.send(&email) {
//!     Ok(_) => println!("Email sent successfully!"),
//!     Err(e) if e.is_recipients() && !e.is_fatal() => {
//!         println!("Email sent, some recipients were rejected: {e}")
//!     }
//!     Err(e) => panic!("Could not send email: {e:?}"),
//! }
//! # Ok(())
//! # }
//! # #[cfg(not(all(feature = "builder", feature = "smtp-transport", feature = "native-tls")))]
//! # fn main() {}
//! ```

#![doc(html_root_url = "https://docs.rs/crate/relaymail/0.3.0")]
#![forbid(unsafe_code)]
#![deny(
    clippy::string_add,
    clippy::string_add_assign,
    clippy::clone_on_ref_ptr,
    clippy::verbose_file_reads,
    clippy::unnecessary_self_imports,
    clippy::string_to_string,
    clippy::mem_forget,
    clippy::cast_lossless,
    clippy::inefficient_to_string,
    clippy::inline_always,
    clippy::linkedlist,
    clippy::macro_use_imports,
    clippy::manual_assert,
    clippy::unnecessary_join,
    clippy::zero_sized_map_values
)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod address;
pub mod encoder;
pub mod error;
#[cfg(feature = "builder")]
#[cfg_attr(docsrs, doc(cfg(feature = "builder")))]
pub mod message;
pub mod transport;

use std::error::Error as StdError;

pub use crate::address::{Address, Envelope};
pub use crate::error::Error;
#[cfg(feature = "builder")]
pub use crate::message::Message;
#[cfg(feature = "smtp-transport")]
pub use crate::transport::smtp::SmtpTransport;
pub use crate::transport::Transport;

pub(crate) type BoxError = Box<dyn StdError + Send + Sync>;
