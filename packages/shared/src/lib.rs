//! Utilities shared by the Niwot workspace packages.

pub mod logger;
pub mod time;
