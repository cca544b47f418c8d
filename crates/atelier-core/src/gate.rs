//! Access gate seam
//!
//! Authorization is handled by an external collaborator; the pipeline only
//! consults this narrow contract before writes, deletes and trash-view reads.

/// Privilege check consulted before any mutating operation.
pub trait AccessGate: Send + Sync {
    fn is_privileged(&self) -> bool;
}

/// Gate that grants everything. Useful for tests and trusted contexts.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl AccessGate for AllowAll {
    fn is_privileged(&self) -> bool {
        true
    }
}

/// Gate that denies everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct DenyAll;

impl AccessGate for DenyAll {
    fn is_privileged(&self) -> bool {
        false
    }
}
