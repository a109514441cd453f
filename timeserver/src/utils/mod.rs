//! Internal data structures.
//!
//! [`Slab`] provides fast indexed storage with reuse of freed slots; the
//! reactor keys its connections by slab index.

mod slab;

pub(crate) use slab::Slab;
