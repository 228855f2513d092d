// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (bearer token, role guard, organization check)
pub mod public;
pub mod protected;
