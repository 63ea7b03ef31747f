//! Base64 text form of binary values.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use weft_codec::CodecError;

pub(crate) fn encode(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub(crate) fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(text)
        .map_err(|err| {
            CodecError::type_mismatch("base64 string", format!("invalid base64 ({err})"))
        })
}
