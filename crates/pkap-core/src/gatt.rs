//! GATT identifiers of the BLE-PKAP service.

use uuid::Uuid;

/// Primary service exposed by a BLE-PKAP responder.
pub const PKAP_SERVICE_UUID: Uuid = Uuid::from_u128(0xe278ee00_bc2c_e6c0_583c_1c5f15336b24);

/// Auth characteristic: written with the initiator token, read back for the responder token.
pub const PKAP_AUTH_CHAR_UUID: Uuid = Uuid::from_u128(0xe278ee01_bc2c_e6c0_583c_1c5f15336b24);
