// handlers/mod.rs - Route handlers by security tier
//
// Public (no auth) → Organizations (bearer auth, permission-gated per organization)
pub mod organizations;
pub mod public;
