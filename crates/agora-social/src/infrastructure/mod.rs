//! Store adapters that live alongside the domain.

pub mod in_memory;
