//! URL-safe wire encoding of atoms.
//!
//! Clients send atoms base64-encoded with the URL-safe alphabet so that `/`
//! and `+` survive query strings. Padding is optional on input; output is
//! never padded. Input in the standard alphabet is accepted as well, since
//! some workers encode build logs with it.

use base64::alphabet;
use base64::engine::general_purpose::GeneralPurpose;
use base64::engine::{DecodePaddingMode, GeneralPurposeConfig};
use base64::Engine as _;

use crate::atom::Atom;
use crate::error::CoreError;

/// URL-safe alphabet, unpadded output, padding-indifferent input.
pub const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Standard alphabet, padding-indifferent input.
pub const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes arbitrary bytes (build logs) from the wire encoding.
pub fn decode_bytes(encoded: &str) -> Result<Vec<u8>, CoreError> {
    let encoded = encoded.trim();
    URL_SAFE_LENIENT
        .decode(encoded)
        .or_else(|url_err| STANDARD_LENIENT.decode(encoded).map_err(|_| url_err))
        .map_err(|e| CoreError::InvalidEncoding {
            reason: e.to_string(),
        })
}

/// Decodes a wire-encoded atom.
///
/// Fails on malformed base64, non-UTF-8 content, and atoms rejected by
/// [`Atom::new`].
pub fn decode_atom(encoded: &str) -> Result<Atom, CoreError> {
    let bytes = decode_bytes(encoded)?;
    let text = String::from_utf8(bytes).map_err(|e| CoreError::InvalidEncoding {
        reason: e.to_string(),
    })?;
    Atom::new(text)
}

/// Encodes an atom for the wire.
pub fn encode_atom(atom: &Atom) -> String {
    URL_SAFE_LENIENT.encode(atom.as_str())
}
