//! PKCE material: random state, verifier and the S256 challenge.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;
use sha2::{Digest, Sha256};

/// 256-bit random state, URL-safe.
pub fn generate_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// 512-bit random code verifier, URL-safe.
pub fn generate_verifier() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge: unpadded URL-safe base64 of SHA-256(verifier).
pub fn challenge_from_verifier(verifier: &str) -> String {
    let digest = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(digest)
}

/// Verifier/challenge pair for one authorization round.
pub fn generate_pkce_pair() -> (String, String) {
    let verifier = generate_verifier();
    let challenge = challenge_from_verifier(&verifier);
    (verifier, challenge)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_challenge_round_trip() {
        let (verifier, challenge) = generate_pkce_pair();
        assert_eq!(challenge_from_verifier(&verifier), challenge);
        assert!(!challenge.contains('='));
        assert!(!challenge.contains('+'));
        assert!(!challenge.contains('/'));
    }

    #[test]
    fn test_known_vector() {
        // RFC 7636 appendix B
        let verifier = "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk";
        assert_eq!(
            challenge_from_verifier(verifier),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_material_lengths() {
        // 32 and 64 bytes survive unpadded base64 intact.
        assert_eq!(generate_state().len(), 43);
        assert_eq!(generate_verifier().len(), 86);
    }

    #[test]
    fn test_material_is_unique() {
        assert_ne!(generate_state(), generate_state());
        assert_ne!(generate_verifier(), generate_verifier());
    }
}
