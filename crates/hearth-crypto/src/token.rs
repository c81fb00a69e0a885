use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;

use hearth_types::SessionToken;

/// Entropy per session token, in bytes (256 bits).
pub const TOKEN_BYTES: usize = 32;

/// Draw a fresh session token from the operating system's CSPRNG.
///
/// The token is URL-safe base64 without padding, so it can travel in a
/// cookie or a header unescaped.
pub fn generate_token() -> SessionToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    SessionToken::new(URL_SAFE_NO_PAD.encode(bytes))
}
