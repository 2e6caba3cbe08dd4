/// Tower middleware for the API server
///
/// Authentication lives in `teamtask_shared::auth::middleware`; this module
/// holds the HTTP-only layers.

pub mod security;
