//! LE Secure Connections confirm value generation.
//!
//! Implements the `f4` function from the Bluetooth Core Specification
//! (Vol 3, Part H, 2.2.6) and the OOB confirmation value a device
//! publishes alongside its random value.

use aes::cipher::generic_array::GenericArray;
use aes::Aes128;
use cmac::{Cmac, Mac};

/// `f4(U, V, X, Z) = AES-CMAC_X(U || V || Z)`.
///
/// All inputs and the output are most-significant-octet first.
pub fn f4(u: &[u8; 32], v: &[u8; 32], x: &[u8; 16], z: u8) -> [u8; 16] {
    let mut mac = <Cmac<Aes128> as Mac>::new(GenericArray::from_slice(x));
    mac.update(u);
    mac.update(v);
    mac.update(&[z]);

    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; 16];
    out.copy_from_slice(&tag);
    out
}

/// OOB confirmation value `Ca = f4(PKa.x, PKa.x, ra, 0)`.
///
/// `pk_x` is the X coordinate of the local LESC public key, big-endian as
/// produced by SEC1 encoding. `rand` and the result use the controller's
/// little-endian octet order, matching the values carried in AD elements.
pub fn oob_confirm_value(pk_x: &[u8; 32], rand: &[u8; 16]) -> [u8; 16] {
    let mut r = *rand;
    r.reverse();
    let mut confirm = f4(pk_x, pk_x, &r, 0);
    confirm.reverse();
    confirm
}
