// Share codec: content + version <-> URL-safe token.
//
// Pipeline: canonical JSON -> Brotli -> base64url (no padding) -> percent-escaping.
// Decoding reverses the stages in order; every stage reports a typed failure.

use std::fmt;
use std::io::{Read, Write};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::types::SharePayload;

/// Brotli quality (0-11). Tokens are small; favour ratio over speed.
const BROTLI_QUALITY: u32 = 11;
/// Brotli window size exponent.
const BROTLI_LG_WINDOW: u32 = 22;
const BROTLI_BUFFER_SIZE: usize = 4096;
/// Upper bound on decompressed payload size, guards against decompression bombs.
pub const MAX_DECODED_BYTES: usize = 8 * 1024 * 1024;

/// The decode stage at which a token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    Unescape,
    Transport,
    Decompress,
    Parse,
}

impl fmt::Display for DecodeStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unescape => f.write_str("unescape"),
            Self::Transport => f.write_str("base64"),
            Self::Decompress => f.write_str("decompress"),
            Self::Parse => f.write_str("parse"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ShareError {
    #[error("failed to encode share payload: {0}")]
    Encoding(String),
    #[error("malformed share token ({stage}): {reason}")]
    Decoding { stage: DecodeStage, reason: String },
}

impl ShareError {
    fn decoding(stage: DecodeStage, reason: impl fmt::Display) -> Self {
        Self::Decoding { stage, reason: reason.to_string() }
    }
}

/// Encode a share payload into a URL-safe token.
pub fn encode(payload: &SharePayload) -> Result<String, ShareError> {
    encode_value(payload)
}

/// Decode a token produced by [`encode`].
pub fn decode(token: &str) -> Result<SharePayload, ShareError> {
    decode_value(token)
}

/// Encode any serializable value with the share pipeline.
pub fn encode_value<T: Serialize>(value: &T) -> Result<String, ShareError> {
    let json = serde_json::to_vec(value).map_err(|e| ShareError::Encoding(e.to_string()))?;
    let compressed = compress(&json).map_err(|e| ShareError::Encoding(e.to_string()))?;
    let transport = URL_SAFE_NO_PAD.encode(compressed);
    Ok(urlencoding::encode(&transport).into_owned())
}

/// Decode a token into any deserializable value.
pub fn decode_value<T: DeserializeOwned>(token: &str) -> Result<T, ShareError> {
    let unescaped = urlencoding::decode(token.trim())
        .map_err(|e| ShareError::decoding(DecodeStage::Unescape, e))?;
    let compressed = URL_SAFE_NO_PAD
        .decode(unescaped.as_bytes())
        .map_err(|e| ShareError::decoding(DecodeStage::Transport, e))?;
    let json = decompress(&compressed)?;
    serde_json::from_slice(&json).map_err(|e| ShareError::decoding(DecodeStage::Parse, e))
}

fn compress(input: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut writer = brotli::CompressorWriter::new(
        Vec::new(),
        BROTLI_BUFFER_SIZE,
        BROTLI_QUALITY,
        BROTLI_LG_WINDOW,
    );
    writer.write_all(input)?;
    writer.flush()?;
    Ok(writer.into_inner())
}

fn decompress(input: &[u8]) -> Result<Vec<u8>, ShareError> {
    if input.is_empty() {
        return Err(ShareError::decoding(DecodeStage::Decompress, "empty payload"));
    }

    let decoder = brotli::Decompressor::new(input, BROTLI_BUFFER_SIZE);
    let mut output = Vec::new();
    decoder
        .take(MAX_DECODED_BYTES as u64 + 1)
        .read_to_end(&mut output)
        .map_err(|e| ShareError::decoding(DecodeStage::Decompress, e))?;

    if output.len() > MAX_DECODED_BYTES {
        return Err(ShareError::decoding(
            DecodeStage::Decompress,
            format!("payload exceeds {MAX_DECODED_BYTES} bytes"),
        ));
    }
    Ok(output)
}
