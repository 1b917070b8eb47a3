//! `revtree` is a persistent, revision-numbered, copy-on-write B-tree
//! key/value storage engine. Keys and tags (values) are opaque byte
//! strings; the tree is paged into fixed-size blocks on a single data
//! file, with crash-safe commits backed by two alternating base files.
//!
//! Readers of any still-committed revision are never disturbed by a
//! concurrent writer: a block in use at the start of a transaction is
//! copied-on-write rather than updated in place, and its old copy is
//! only reclaimed once no base file can still reach it.
//!
//! This crate carries no network protocol, no secondary indexes, no
//! schema, and enforces only a single writer per table at a time — see
//! `SPEC_FULL.md` for the full set of non-goals and `DESIGN.md` for how
//! each module here is grounded.

mod error;

mod base;
mod bitmap;
mod block_io;
mod btree;
mod check;
mod codec;
mod config;
mod cursor;
mod lockfile;
mod page;

pub use crate::block_io::{BlockIo, FileBlockIo, MemBlockIo};
pub use crate::btree::Table;
pub use crate::check::CheckReport;
pub use crate::config::Config;
pub use crate::cursor::Cursor;
pub use crate::error::{Error, Result};
