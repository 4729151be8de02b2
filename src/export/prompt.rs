use async_trait::async_trait;

use crate::error::ExportError;

/// Decisions the direct-delivery fallback needs from the user.
#[async_trait]
pub trait UserPrompt: Send + Sync {
    /// Deliver `count` files one by one?
    async fn confirm_direct_delivery(&self, count: usize) -> bool;

    /// Delivering `filename` failed; go on with the remaining files?
    async fn continue_after_failure(&self, filename: &str, error: &ExportError) -> bool;
}

/// Says yes to everything.
pub struct AutoConfirm;

#[async_trait]
impl UserPrompt for AutoConfirm {
    async fn confirm_direct_delivery(&self, _count: usize) -> bool {
        true
    }

    async fn continue_after_failure(&self, _filename: &str, _error: &ExportError) -> bool {
        true
    }
}

/// Says no to everything.
pub struct AutoDecline;

#[async_trait]
impl UserPrompt for AutoDecline {
    async fn confirm_direct_delivery(&self, _count: usize) -> bool {
        false
    }

    async fn continue_after_failure(&self, _filename: &str, _error: &ExportError) -> bool {
        false
    }
}
