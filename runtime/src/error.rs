//! Delivery error types.

use thiserror::Error;

/// Result type for delivery operations.
pub type Result<T> = std::result::Result<T, DeliveryError>;

/// Why a message could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    // ═══════════════════════════════════════════════════════════════════════
    // Permanent
    // ═══════════════════════════════════════════════════════════════════════
    /// A sender or recipient address does not parse.
    #[error("Invalid address {address:?}: {reason}")]
    InvalidAddress {
        /// The offending address.
        address: String,
        /// Parser message.
        reason: String,
    },

    /// The message could not be assembled.
    #[error("Failed to build email: {0}")]
    Build(String),

    // ═══════════════════════════════════════════════════════════════════════
    // Transient
    // ═══════════════════════════════════════════════════════════════════════
    /// The transport refused or failed to send.
    #[error("Failed to send email: {0}")]
    Transport(String),

    /// The blocking send task panicked or was cancelled.
    #[error("Email task failed: {0}")]
    Task(String),
}

impl DeliveryError {
    /// Whether trying again might succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Task(_))
    }
}
