//! An iterative DNS resolver with a credibility-ranked cache.
//!
//! This crate provides the building blocks for resolving host names via
//! the DNS: domain names and a minimal message codec, a cache that keeps
//! what was learned together with how trustworthy it is, and a resolver
//! that drives queries to name servers, follows aliases and referrals, and
//! bounds the amount of work it does for each lookup.
//!
//! # Modules
//!
//! A set of modules providing fundamental types and functionality is always
//! enabled:
//!
//! * [base] contains domain names, the IANA-assigned parameters, and the
//!   message codec,
//! * [cache] contains the record cache and the cache of delegations, and
//! * [utils] contains small helpers such as the clock used by the cache.
//!
#![cfg_attr(feature = "resolv", doc = "* [resolv]:")]
#![cfg_attr(not(feature = "resolv"), doc = "* resolv:")]
//!   The asynchronous resolver based on the [Tokio](https://tokio.rs/)
//!   async runtime.
//!
//! # Reference of Feature Flags
//!
//! * `resolv`: Enables the asynchronous resolver via the
#![cfg_attr(feature = "resolv", doc = "  [resolv]")]
#![cfg_attr(not(feature = "resolv"), doc = "  resolv")]
//!   module.
//! * `serde`: Enables serde serialization for domain names as well as
//!   the configuration types.

#![allow(renamed_and_removed_lints)]
#![allow(clippy::unknown_clippy_lints)]
#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod base;
pub mod cache;
#[cfg(feature = "resolv")]
#[cfg_attr(docsrs, doc(cfg(feature = "resolv")))]
pub mod resolv;
pub mod utils;
