//! Payload masking (RFC 6455 Section 5.3).
//!
//! Masking is an XOR with a repeating 4-byte key, so applying the same key
//! twice restores the original bytes.

/// Byte-at-a-time XOR masking.
#[inline]
pub fn apply_mask(data: &mut [u8], mask: [u8; 4]) {
    for (i, byte) in data.iter_mut().enumerate() {
        *byte ^= mask[i % 4];
    }
}

/// Word-at-a-time XOR masking; identical output to [`apply_mask`].
#[inline]
pub fn apply_mask_fast(data: &mut [u8], mask: [u8; 4]) {
    let mask_u32 = u32::from_ne_bytes(mask);
    let mut chunks = data.chunks_exact_mut(4);
    for chunk in &mut chunks {
        let word = u32::from_ne_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) ^ mask_u32;
        chunk.copy_from_slice(&word.to_ne_bytes());
    }
    for (byte, key) in chunks.into_remainder().iter_mut().zip(mask) {
        *byte ^= key;
    }
}

/// Draw a fresh masking key from the operating system's random source.
///
/// # Errors
///
/// Returns [`Error::Io`](crate::Error::Io) if no randomness is available.
pub fn random_mask() -> crate::Result<[u8; 4]> {
    let mut key = [0u8; 4];
    getrandom::getrandom(&mut key)?;
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC_KEY: [u8; 4] = [0x37, 0xfa, 0x21, 0x3d];

    #[test]
    fn test_mask_rfc_example() {
        // RFC 6455 Section 5.7: masked "Hello"
        let mut data = b"Hello".to_vec();
        apply_mask(&mut data, RFC_KEY);
        assert_eq!(data, [0x7f, 0x9f, 0x4d, 0x51, 0x58]);
    }

    #[test]
    fn test_mask_is_self_inverse() {
        let original: Vec<u8> = (0..=255).collect();
        let mut data = original.clone();
        apply_mask(&mut data, RFC_KEY);
        assert_ne!(data, original);
        apply_mask(&mut data, RFC_KEY);
        assert_eq!(data, original);
    }

    #[test]
    fn test_mask_empty_payload() {
        let mut data: Vec<u8> = Vec::new();
        apply_mask(&mut data, RFC_KEY);
        apply_mask_fast(&mut data, RFC_KEY);
        assert!(data.is_empty());
    }

    #[test]
    fn test_fast_matches_scalar_for_all_tail_lengths() {
        for len in 0..37 {
            let mut scalar: Vec<u8> = (0..len as u8).collect();
            let mut fast = scalar.clone();
            apply_mask(&mut scalar, RFC_KEY);
            apply_mask_fast(&mut fast, RFC_KEY);
            assert_eq!(scalar, fast, "length {len}");
        }
    }

    #[test]
    fn test_random_mask_varies() {
        let keys: Vec<[u8; 4]> = (0..8).map(|_| random_mask().unwrap()).collect();
        assert!(keys.windows(2).any(|pair| pair[0] != pair[1]));
    }
}
