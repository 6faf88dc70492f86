//! Local OOB data returned by the controller.

use std::ops::BitOr;

use pkap_core::error::FormatError;
use pkap_core::token::{CONFIRM_LEN, RANDOM_LEN};

use crate::ad::{AdType, AdvertisingData};

/// Address type mask sent with Read Local OOB Extended Data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddressTypes(u8);

impl AddressTypes {
    pub const BR_EDR: Self = Self(0x01);
    pub const LE_PUBLIC: Self = Self(0x02);
    pub const LE_RANDOM: Self = Self(0x04);
    /// LE public and random.
    pub const LE: Self = Self(0x06);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl Default for AddressTypes {
    fn default() -> Self {
        Self::LE
    }
}

impl BitOr for AddressTypes {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Result of Read Local OOB Extended Data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOobExtendedData {
    pub address_types: AddressTypes,
    pub data: AdvertisingData,
}

/// LE Secure Connections OOB values for one pairing attempt.
///
/// The controller regenerates these on every read; never reuse a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OobPair {
    pub confirm: [u8; CONFIRM_LEN],
    pub rand: [u8; RANDOM_LEN],
}

impl OobPair {
    pub fn new(confirm: [u8; CONFIRM_LEN], rand: [u8; RANDOM_LEN]) -> Self {
        Self { confirm, rand }
    }

    /// Extract the LESC confirmation and random elements.
    pub fn from_advertising_data(data: &AdvertisingData) -> Result<Self, FormatError> {
        let confirm = data
            .get(AdType::LescConfirmationValue)
            .ok_or(FormatError::MissingElement(AdType::LescConfirmationValue as u8))?;
        let rand = data
            .get(AdType::LescRandomValue)
            .ok_or(FormatError::MissingElement(AdType::LescRandomValue as u8))?;

        Ok(Self {
            confirm: confirm
                .try_into()
                .map_err(|_| FormatError::InvalidConfirmLength(confirm.len()))?,
            rand: rand
                .try_into()
                .map_err(|_| FormatError::InvalidRandomLength(rand.len()))?,
        })
    }
}

/// Result of the legacy Read Local OOB Data command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocalOobData {
    pub hash192: [u8; 16],
    pub randomizer192: [u8; 16],
    /// Present when the controller supports Secure Connections.
    pub hash256: Option<[u8; 16]>,
    pub randomizer256: Option<[u8; 16]>,
}

impl LocalOobData {
    /// Parse the 32 or 64 byte return parameters.
    pub fn parse(data: &[u8]) -> Result<Self, FormatError> {
        let block = |offset: usize| -> [u8; 16] {
            let mut out = [0u8; 16];
            out.copy_from_slice(&data[offset..offset + 16]);
            out
        };

        match data.len() {
            32 => Ok(Self {
                hash192: block(0),
                randomizer192: block(16),
                hash256: None,
                randomizer256: None,
            }),
            64 => Ok(Self {
                hash192: block(0),
                randomizer192: block(16),
                hash256: Some(block(32)),
                randomizer256: Some(block(48)),
            }),
            n => Err(FormatError::InvalidResponse(format!(
                "local OOB data must be 32 or 64 bytes, got {}",
                n
            ))),
        }
    }
}
