//! Small helpers shared by the client and the nodes.

pub mod b64;
pub mod folder;
pub mod redact;
