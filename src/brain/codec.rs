use serde::Serialize;
use serde::de::DeserializeOwned;

/// Prefix of every blob written in the current format.
pub const MAGIC: &[u8; 4] = b"RFX\0";
/// Current blob format version.
pub const VERSION: u8 = 1;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode blob: {0}")]
    Encode(#[from] rmp_serde::encode::Error),
    #[error("corrupt blob body: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
    #[error("blob header is truncated")]
    Truncated,
    #[error("unsupported blob version {0}")]
    UnsupportedVersion(u8),
    #[error("invalid legacy json blob: {0}")]
    Legacy(#[from] serde_json::Error),
}

/// A decoded blob, tagged with the format it was read from.
#[derive(Debug)]
pub enum Decoded<T, L> {
    Current(T),
    Legacy(L),
}

/// Encode in the current format: magic, version byte, MessagePack body.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    let body = rmp_serde::to_vec_named(value)?;
    let mut out = Vec::with_capacity(MAGIC.len() + 1 + body.len());
    out.extend_from_slice(MAGIC);
    out.push(VERSION);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Decode a blob. Blobs without the magic prefix are read as legacy JSON
/// into `L`.
pub fn decode<T, L>(bytes: &[u8]) -> Result<Decoded<T, L>, CodecError>
where
    T: DeserializeOwned,
    L: DeserializeOwned,
{
    match bytes.strip_prefix(MAGIC.as_slice()) {
        Some(rest) => {
            let (&version, body) = rest.split_first().ok_or(CodecError::Truncated)?;
            if version != VERSION {
                return Err(CodecError::UnsupportedVersion(version));
            }
            Ok(Decoded::Current(rmp_serde::from_slice(body)?))
        }
        None => Ok(Decoded::Legacy(serde_json::from_slice(bytes)?)),
    }
}
