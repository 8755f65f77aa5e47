//! Bencode codec for KRPC datagrams ([BEP-3]).
//!
//! Every DHT message is a bencoded dictionary. The codec round-trips the four
//! primitive shapes losslessly:
//!
//! | Shape | Wire form | Example |
//! |-------|-----------|---------|
//! | Integer | `i<n>e` | `i6881e` |
//! | Byte string | `<len>:<bytes>` | `4:ping` |
//! | List | `l<items>e` | `li201e12:Generic Errore` |
//! | Dictionary | `d<key><value>...e` | `d1:t2:aa1:y1:re` |
//!
//! # Examples
//!
//! ```
//! use dht_crawler::bencode::{decode, encode, Value};
//!
//! let value = decode(b"d1:t2:aa1:y1:qe").unwrap();
//! assert_eq!(value.get(b"y").and_then(Value::as_str), Some("q"));
//! assert_eq!(encode(&value), b"d1:t2:aa1:y1:qe");
//! ```
//!
//! Decoding is strict: non-canonical integers, truncated input, non-string
//! dictionary keys, nesting deeper than 64 levels and trailing bytes are all
//! rejected with a [`BencodeError`].
//!
//! [BEP-3]: http://bittorrent.org/beps/bep_0003.html

mod decode;
mod encode;
mod error;
mod value;

pub use decode::decode;
pub use encode::encode;
pub use error::BencodeError;
pub use value::{Dict, Value};
