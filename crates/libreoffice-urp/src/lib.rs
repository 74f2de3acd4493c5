//! A small UNO Remote Protocol (URP) client for driving LibreOffice.
//!
//! LibreOffice exposes its API over URP when started with an acceptor:
//!
//! ```text
//! soffice --headless --accept="socket,host=127.0.0.1,port=2002;urp;StarOffice.ServiceManager"
//! ```
//!
//! Layers, bottom up:
//! - [`framing`]: 8-byte block headers over any async byte stream
//! - [`codec`]: value marshalling and the type/OID/TID caches
//! - [`message`]: request and reply headers
//! - [`bridge`]: negotiation, synchronous calls, bootstrap of the Desktop
//!
//! Only the method tables in [`methods`] can be called; they cover what a
//! spreadsheet print-setup client needs.
//!
//! ```rust,no_run
//! use libreoffice_urp::{Connection, UnoUrl};
//!
//! # async fn example() -> libreoffice_urp::Result<()> {
//! let url: UnoUrl = "uno:socket,host=127.0.0.1,port=2002;urp;StarOffice.ComponentContext".parse()?;
//! let mut conn = Connection::connect(&url).await?;
//! let objects = conn.bootstrap(&url.object).await?;
//! println!("desktop is {}", objects.desktop);
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod cache;
pub mod codec;
pub mod error;
pub mod framing;
pub mod message;
pub mod methods;
pub mod types;
pub mod url;

pub use bridge::{Bootstrap, Connection};
pub use codec::property_value;
pub use error::{Result, UrpError};
pub use types::{names, Any, Type, TypeClass, UnoValue};
pub use url::UnoUrl;
