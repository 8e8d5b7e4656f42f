//! Network Upgrade Schedule
//!
//! Feature activation is decided by an explicit [`ActivationPolicy`]
//! handed to whoever needs it, never inferred from ambient node state.
//! Each upgrade epoch carries a consensus branch identifier that feeds
//! the signature digest, so transactions signed under one ruleset are
//! invalid under another.

use serde::{Deserialize, Serialize};

/// Transaction version introduced by the overwinter upgrade.
pub const OVERWINTER_TX_VERSION: u32 = 3;
/// Transaction version introduced by the shielded-pool upgrade.
pub const SHIELDED_TX_VERSION: u32 = 4;

pub const OVERWINTER_VERSION_GROUP_ID: u32 = 0x03C4_8270;
pub const SHIELDED_VERSION_GROUP_ID: u32 = 0x892F_2085;

/// Branch identifiers per upgrade epoch.
pub const BRANCH_ID_BASE: u32 = 0;
pub const BRANCH_ID_OVERWINTER: u32 = 0x5BA8_1B19;
pub const BRANCH_ID_SHIELDED: u32 = 0x76B8_09BB;
pub const BRANCH_ID_ENCODING_V2: u32 = 0x7361_6231;

/// Blocks after the target height at which a transaction expires.
pub const EXPIRY_HEIGHT_DELTA: u32 = 20;

/// The version fields a transaction built for some height must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxFormat {
    pub overwintered: bool,
    pub version: u32,
    pub version_group_id: u32,
}

/// Per-network upgrade heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationPolicy {
    pub overwinter_height: u32,
    pub shielded_height: u32,
    /// Height from which new note plaintexts use the v2 lead byte.
    pub encoding_v2_height: u32,
}

impl ActivationPolicy {
    pub fn mainnet() -> Self {
        Self {
            overwinter_height: 152_855,
            shielded_height: 419_200,
            encoding_v2_height: 903_800,
        }
    }

    pub fn testnet() -> Self {
        Self {
            overwinter_height: 207_500,
            shielded_height: 280_000,
            encoding_v2_height: 660_000,
        }
    }

    /// All upgrades active from genesis.
    pub fn regtest() -> Self {
        Self {
            overwinter_height: 0,
            shielded_height: 0,
            encoding_v2_height: 0,
        }
    }

    pub fn overwinter_active(&self, height: u32) -> bool {
        height >= self.overwinter_height
    }

    pub fn shielded_active(&self, height: u32) -> bool {
        height >= self.shielded_height
    }

    pub fn output_encoding_v2_active(&self, height: u32) -> bool {
        height >= self.encoding_v2_height
    }

    /// The branch identifier in force at a height.
    pub fn branch_id(&self, height: u32) -> u32 {
        if self.output_encoding_v2_active(height) {
            BRANCH_ID_ENCODING_V2
        } else if self.shielded_active(height) {
            BRANCH_ID_SHIELDED
        } else if self.overwinter_active(height) {
            BRANCH_ID_OVERWINTER
        } else {
            BRANCH_ID_BASE
        }
    }

    /// The version fields for a transaction targeting a height.
    pub fn tx_format(&self, height: u32) -> TxFormat {
        if self.shielded_active(height) {
            TxFormat {
                overwintered: true,
                version: SHIELDED_TX_VERSION,
                version_group_id: SHIELDED_VERSION_GROUP_ID,
            }
        } else if self.overwinter_active(height) {
            TxFormat {
                overwintered: true,
                version: OVERWINTER_TX_VERSION,
                version_group_id: OVERWINTER_VERSION_GROUP_ID,
            }
        } else {
            TxFormat {
                overwintered: false,
                version: 1,
                version_group_id: 0,
            }
        }
    }

    /// Default expiry height for a transaction targeting `height`.
    pub fn expiry_height(&self, height: u32) -> u32 {
        height.saturating_add(EXPIRY_HEIGHT_DELTA)
    }
}
