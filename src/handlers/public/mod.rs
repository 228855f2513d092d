// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition and service probes. Handlers here never see a Requester.
pub mod auth;
pub mod system;
