//! Unpadded URL-safe base64, as used by JWT segments

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// Encode bytes as base64 with `-`/`_` in place of `+`/`/` and no `=` padding
pub fn encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
