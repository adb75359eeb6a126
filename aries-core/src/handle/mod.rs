//! `handle` gives every live protocol object a stable opaque identifier
//!
//! Each object kind owns one [`ObjectCache`], so handles are unique per kind and are
//! never reused for the lifetime of the process. An object is reachable only through
//! its cache, exchanges refer to their connection by handle instead of owning it.
mod registry;
pub use registry::{Handle, ObjectCache};
