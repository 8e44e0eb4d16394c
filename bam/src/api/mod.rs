//! Local debug/introspection endpoint.
//!
//! An optional collaborator: the run does not depend on it, and a failure
//! to bind the port is reported as a warning only.

mod server;
mod status;

pub use self::{server::Server, status::DebugState};
