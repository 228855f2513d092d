// handlers/protected/mod.rs - Protected handlers (bearer token required)
//
// Every route here runs behind `authenticate`, which places the Requester in
// request extensions, and a per-route `RoleGuard`. Handlers build their
// AccessTarget and call `AppState::authorize` before touching data.
pub mod auth;
pub mod boards;
pub mod organizations;
pub mod tickets;
pub mod users;
