//! Advertising data (AD) element decoding.
//!
//! AD format: [Length: 1 byte][Type: 1 byte][Value: Length-1 bytes]
//! The length byte counts the type byte but not itself.

use pkap_core::error::FormatError;
use tracing::debug;

/// Well-known AD element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum AdType {
    Flags = 0x01,
    Incomplete16BitServiceUuids = 0x02,
    Complete16BitServiceUuids = 0x03,
    Incomplete32BitServiceUuids = 0x04,
    Complete32BitServiceUuids = 0x05,
    Incomplete128BitServiceUuids = 0x06,
    Complete128BitServiceUuids = 0x07,
    ShortenedLocalName = 0x08,
    CompleteLocalName = 0x09,
    TxPowerLevel = 0x0A,
    ClassOfDevice = 0x0D,
    SimplePairingHashC = 0x0E,
    SimplePairingRandomizerR = 0x0F,
    SecurityManagerTkValue = 0x10,
    SecurityManagerOobFlags = 0x11,
    PeripheralConnectionIntervalRange = 0x12,
    ServiceSolicitation16BitUuids = 0x14,
    ServiceSolicitation128BitUuids = 0x15,
    ServiceData = 0x16,
    PublicTargetAddress = 0x17,
    RandomTargetAddress = 0x18,
    Appearance = 0x19,
    AdvertisingInterval = 0x1A,
    LeBluetoothDeviceAddress = 0x1B,
    LeRole = 0x1C,
    SimplePairingHashC256 = 0x1D,
    SimplePairingRandomizerR256 = 0x1E,
    ServiceSolicitation32BitUuids = 0x1F,
    ServiceData32BitUuid = 0x20,
    ServiceData128BitUuid = 0x21,
    LescConfirmationValue = 0x22,
    LescRandomValue = 0x23,
    Uri = 0x24,
    IndoorPositioning = 0x25,
    TransportDiscoveryData = 0x26,
    LeSupportedFeatures = 0x27,
    ChannelMapUpdateIndication = 0x28,
    PbAdv = 0x29,
    MeshMessage = 0x2A,
    MeshBeacon = 0x2B,
    BigInfo = 0x2C,
    BroadcastCode = 0x2D,
    InformationData3d = 0x3D,
    ManufacturerSpecificData = 0xFF,
}

impl AdType {
    /// Convert from raw tag.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x01 => Some(Self::Flags),
            0x02 => Some(Self::Incomplete16BitServiceUuids),
            0x03 => Some(Self::Complete16BitServiceUuids),
            0x04 => Some(Self::Incomplete32BitServiceUuids),
            0x05 => Some(Self::Complete32BitServiceUuids),
            0x06 => Some(Self::Incomplete128BitServiceUuids),
            0x07 => Some(Self::Complete128BitServiceUuids),
            0x08 => Some(Self::ShortenedLocalName),
            0x09 => Some(Self::CompleteLocalName),
            0x0A => Some(Self::TxPowerLevel),
            0x0D => Some(Self::ClassOfDevice),
            0x0E => Some(Self::SimplePairingHashC),
            0x0F => Some(Self::SimplePairingRandomizerR),
            0x10 => Some(Self::SecurityManagerTkValue),
            0x11 => Some(Self::SecurityManagerOobFlags),
            0x12 => Some(Self::PeripheralConnectionIntervalRange),
            0x14 => Some(Self::ServiceSolicitation16BitUuids),
            0x15 => Some(Self::ServiceSolicitation128BitUuids),
            0x16 => Some(Self::ServiceData),
            0x17 => Some(Self::PublicTargetAddress),
            0x18 => Some(Self::RandomTargetAddress),
            0x19 => Some(Self::Appearance),
            0x1A => Some(Self::AdvertisingInterval),
            0x1B => Some(Self::LeBluetoothDeviceAddress),
            0x1C => Some(Self::LeRole),
            0x1D => Some(Self::SimplePairingHashC256),
            0x1E => Some(Self::SimplePairingRandomizerR256),
            0x1F => Some(Self::ServiceSolicitation32BitUuids),
            0x20 => Some(Self::ServiceData32BitUuid),
            0x21 => Some(Self::ServiceData128BitUuid),
            0x22 => Some(Self::LescConfirmationValue),
            0x23 => Some(Self::LescRandomValue),
            0x24 => Some(Self::Uri),
            0x25 => Some(Self::IndoorPositioning),
            0x26 => Some(Self::TransportDiscoveryData),
            0x27 => Some(Self::LeSupportedFeatures),
            0x28 => Some(Self::ChannelMapUpdateIndication),
            0x29 => Some(Self::PbAdv),
            0x2A => Some(Self::MeshMessage),
            0x2B => Some(Self::MeshBeacon),
            0x2C => Some(Self::BigInfo),
            0x2D => Some(Self::BroadcastCode),
            0x3D => Some(Self::InformationData3d),
            0xFF => Some(Self::ManufacturerSpecificData),
            _ => None,
        }
    }
}

/// Decoded AD elements in the order their tags first appeared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdvertisingData {
    elements: Vec<(u8, Vec<u8>)>,
}

impl AdvertisingData {
    /// Create an empty element set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a flat AD buffer.
    ///
    /// A repeated tag overwrites the earlier value but keeps the position of
    /// its first occurrence. A zero length byte ends the significant part.
    pub fn decode(buf: &[u8]) -> Result<Self, FormatError> {
        let mut data = Self::new();
        let mut i = 0;

        while i < buf.len() {
            let len = buf[i] as usize;
            if len == 0 {
                break;
            }
            if i + len + 1 > buf.len() {
                return Err(FormatError::TruncatedElement {
                    offset: i,
                    declared: len,
                    available: buf.len() - i - 1,
                });
            }

            let typ = buf[i + 1];
            let value = &buf[i + 2..i + len + 1];
            debug!("AD element 0x{:02x}: {}", typ, hex::encode(value));
            data.insert(typ, value.to_vec());
            i += len + 1;
        }

        Ok(data)
    }

    /// Insert or overwrite the value for a raw tag.
    pub fn insert(&mut self, typ: u8, value: Vec<u8>) {
        match self.elements.iter_mut().find(|(t, _)| *t == typ) {
            Some(slot) => slot.1 = value,
            None => self.elements.push((typ, value)),
        }
    }

    /// Get value for type.
    pub fn get(&self, typ: AdType) -> Option<&[u8]> {
        self.get_raw(typ as u8)
    }

    /// Get value for raw tag.
    pub fn get_raw(&self, typ: u8) -> Option<&[u8]> {
        self.elements
            .iter()
            .find(|(t, _)| *t == typ)
            .map(|(_, v)| v.as_slice())
    }

    /// Iterate over `(tag, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (u8, &[u8])> {
        self.elements.iter().map(|(t, v)| (*t, v.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_flags() {
        let data = AdvertisingData::decode(&[0x02, 0x01, 0x06]).unwrap();
        assert_eq!(data.len(), 1);
        assert_eq!(data.get(AdType::Flags), Some(&[0x06][..]));
    }

    #[test]
    fn decode_empty_buffer() {
        let data = AdvertisingData::decode(&[]).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn decode_preserves_order() {
        let buf = [
            0x03, 0x19, 0x40, 0x02, // appearance
            0x02, 0x01, 0x06, // flags
            0x02, 0x1C, 0x00, // role
        ];
        let data = AdvertisingData::decode(&buf).unwrap();
        let tags: Vec<u8> = data.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec![0x19, 0x01, 0x1C]);
    }

    #[test]
    fn decode_lesc_values() {
        let mut buf = vec![17, 0x22];
        buf.extend_from_slice(&[0xC0; 16]);
        buf.push(17);
        buf.push(0x23);
        buf.extend_from_slice(&[0x12; 16]);

        let data = AdvertisingData::decode(&buf).unwrap();
        assert_eq!(data.get(AdType::LescConfirmationValue), Some(&[0xC0; 16][..]));
        assert_eq!(data.get(AdType::LescRandomValue), Some(&[0x12; 16][..]));
    }

    #[test]
    fn duplicate_tag_overwrites_in_place() {
        let buf = [0x02, 0x01, 0x06, 0x02, 0x0A, 0x00, 0x02, 0x01, 0x1A];
        let data = AdvertisingData::decode(&buf).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get(AdType::Flags), Some(&[0x1A][..]));
        let tags: Vec<u8> = data.iter().map(|(t, _)| t).collect();
        assert_eq!(tags, vec![0x01, 0x0A]);
    }

    #[test]
    fn single_byte_element_has_empty_value() {
        let data = AdvertisingData::decode(&[0x01, 0x09]).unwrap();
        assert_eq!(data.get(AdType::CompleteLocalName), Some(&[][..]));
    }

    #[test]
    fn zero_length_terminates() {
        let data = AdvertisingData::decode(&[0x02, 0x01, 0x06, 0x00, 0x00, 0x00]).unwrap();
        assert_eq!(data.len(), 1);
    }

    #[test]
    fn overrun_is_rejected() {
        let err = AdvertisingData::decode(&[0x02, 0x01, 0x06, 0x05, 0x09, 0x41]).unwrap_err();
        assert_eq!(
            err,
            FormatError::TruncatedElement {
                offset: 3,
                declared: 5,
                available: 2,
            }
        );
    }

    #[test]
    fn lone_length_byte_is_rejected() {
        assert!(AdvertisingData::decode(&[0x02]).is_err());
    }

    #[test]
    fn unknown_tags_accessible_by_raw_value() {
        let data = AdvertisingData::decode(&[0x02, 0x7E, 0x55]).unwrap();
        assert_eq!(AdType::from_u8(0x7E), None);
        assert_eq!(data.get_raw(0x7E), Some(&[0x55][..]));
    }

    #[test]
    fn ad_type_from_u8() {
        assert_eq!(AdType::from_u8(0x22), Some(AdType::LescConfirmationValue));
        assert_eq!(AdType::from_u8(0xFF), Some(AdType::ManufacturerSpecificData));
        assert_eq!(AdType::from_u8(0x0B), None);
        for tag in 0..=255u8 {
            if let Some(t) = AdType::from_u8(tag) {
                assert_eq!(t as u8, tag);
            }
        }
    }
}
