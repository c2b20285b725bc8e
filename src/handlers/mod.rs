//! Request handlers, one module per resource.
//!
//! Handlers receive already-validated input (`ValidJson`) and, on protected routes,
//! run behind the `require_role` stage. They talk to the store only through
//! `RepositoryState` and never hold state between requests.

pub mod comments;
pub mod posts;
pub mod token;
pub mod users;
