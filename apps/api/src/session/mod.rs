// Sessions: per-user pipeline state, the orchestrator that advances it,
// and the HTTP handlers scoped to a session id.

pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod store;
