//! Domain-level error taxonomy.
//!
//! Nothing inside the core propagates a fatal error across a component
//! boundary at runtime: decoder failures become the undefined-instruction
//! vector, bad addresses become open-bus reads, and so on. [`GbaError`] exists
//! for the handful of cases that genuinely cannot be absorbed into
//! architectural behavior — mainly initialization, where the host needs a
//! structured reason the system never came up.

use std::fmt::{self, Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GbaError {
    /// BIOS or ROM file missing, unreadable, or the wrong size at init time.
    RomLoad(String),
    /// Cartridge header failed its checksum or structural validation.
    InvalidCartridgeHeader(String),
    /// Backup media file exists but its size doesn't match any known variant.
    InvalidBackupMedia(String),
    /// A backup write at shutdown failed. Logged, never fatal.
    BackupWriteFailed(String),
    /// Programmer error: out-of-range access reached a component that
    /// expected the bus to have already clamped it.
    InternalAddressRange(String),
}

impl GbaError {
    #[must_use]
    pub fn description(&self) -> String {
        match self {
            Self::RomLoad(m)
            | Self::InvalidCartridgeHeader(m)
            | Self::InvalidBackupMedia(m)
            | Self::BackupWriteFailed(m)
            | Self::InternalAddressRange(m) => m.clone(),
        }
    }
}

impl Display for GbaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

impl std::error::Error for GbaError {}

pub type GbaResult<T> = Result<T, GbaError>;
