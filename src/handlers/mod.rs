// handlers/mod.rs - Route handlers
//
// ai      → /api/ai (PII-gated chat proxy), /api/ai/screen (client pre-check)
// auth    → /api/auth/* (stubs)
// finance → /api/finance (financial entries)
// health  → / and /api/health

pub mod ai;
pub mod auth;
pub mod finance;
pub mod health;
