//! dht-crawler - a BitTorrent DHT crawler
//!
//! Joins the mainline DHT, fans out `find_node` queries across the overlay
//! and harvests the `(info-hash, peer)` pairs that real clients announce to
//! it.
//!
//! # Modules
//!
//! - [`bencode`] - BEP-3 bencode codec for KRPC datagrams
//! - [`dht`] - BEP-5 crawling engine, message model and UDP pipeline
//! - [`flow`] - Ramped token supply pacing outbound discovery queries
//! - [`inspector`] - Shared crawl statistics
//! - [`config`] - YAML configuration
//! - [`constants`] - Protocol constants and defaults

pub mod bencode;
pub mod config;
pub mod constants;
pub mod dht;
pub mod flow;
pub mod inspector;

pub use bencode::{decode, encode, BencodeError, Value};
pub use config::{ConfigError, CrawlerConfig};
pub use dht::{Crawler, DhtError, Message, MetaSource, NodeId};
pub use flow::{FlowConfig, FlowControl};
pub use inspector::{Inspector, Stats};
