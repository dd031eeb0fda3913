//! The screening-order core: eligibility gating, exactly-once payment
//! finalization, result processing, and the redirect allowlist.

pub mod eligibility;
pub mod finalize;
pub mod redirect;
pub mod result;
