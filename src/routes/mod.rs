//! Routers grouped by the role they require. Each module applies its own
//! middleware chain as a route layer, so the groups can be merged onto the same
//! paths without their guards leaking into one another.

/// Anonymous access: reads, registration and token issuance.
pub mod public;

/// Writes that require the Poster role (Admins included).
pub mod authenticated;

/// Deletions, restricted to the Admin role.
pub mod admin;
