//! Built-in vendor dialects.

pub mod cisco;
pub mod junos;
