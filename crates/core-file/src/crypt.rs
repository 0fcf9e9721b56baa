//! The optional file cipher: a Beaufort encipherment with a variant
//! autokey (weighted sum of clear text, cipher text and a prime-modulo
//! salt). Encryption and decryption are the same operation.
//!
//! Two flavours: the printable-range cipher maps 0x20..0x7E onto
//! itself (7-bit safe, never makes a newline); the full-range cipher
//! works on all 8-bit values.

/// "The mathematical MOD does not match the computer MOD."
fn mod95(mut val: i32) -> i32 {
    while val >= 9500 {
        val -= 9500;
    }
    while val >= 950 {
        val -= 950;
    }
    while val >= 95 {
        val -= 95;
    }
    while val < 0 {
        val += 95;
    }
    val
}

#[derive(Debug, Clone)]
pub struct Cipher {
    /// 29-bit encipherment key.
    key: i32,
    /// Salt cycled at a prime modulus.
    salt: i32,
    /// Printable-range flavour.
    mod95: bool,
}

impl Cipher {
    pub fn new(mod95: bool) -> Cipher {
        Cipher {
            key: 0,
            salt: 0,
            mod95,
        }
    }

    /// Reset the internal state to a start vector (normally 0).
    pub fn reset(&mut self, vector: i32) {
        self.key = vector;
        self.salt = vector;
    }

    /// Prime the stream from stored key bytes and return the cipher
    /// ready for file content. The key bytes themselves come out
    /// encrypted, which is also how a fresh key gets its stored form.
    pub fn with_key(key_bytes: &[u8], mod95: bool) -> Cipher {
        let mut c = Cipher::new(mod95);
        c.reset(0);
        let mut prime = key_bytes.to_vec();
        c.process(&mut prime);
        c
    }

    /// Encrypt or decrypt a buffer in place.
    pub fn process(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            let mut cc = *b as i32;
            if !self.mod95 || (0x20..=0x7e).contains(&cc) {
                // Feed the top bits of the key back into itself and
                // keep it within 29 bits so the autokey arithmetic
                // below cannot go negative.
                self.key = (self.key & 0x1FFF_FFFF) ^ ((self.key >> 29) & 0x03);
                if self.mod95 {
                    cc = mod95((self.key % 95) - (cc - 0x20)) + 0x20;
                } else {
                    cc = ((self.key & 0xff) - cc) & 0xff;
                }
                if self.salt + 1 >= 20857 {
                    self.salt = 0; // prime modulus
                } else {
                    self.salt += 1;
                }
                self.key = self
                    .key
                    .wrapping_add(self.key)
                    .wrapping_add(cc ^ *b as i32)
                    .wrapping_add(self.salt);
            }
            *b = cc as u8;
        }
    }
}

/// Produce the stored (self-encrypted) form of a user-entered key.
pub fn encrypt_key(plain: &[u8], mod95: bool, fill63: bool) -> Vec<u8> {
    let mut key = plain.to_vec();
    if fill63 && !key.is_empty() {
        // Repeat short keys out so trivial keys diverge.
        while key.len() < 63 {
            let copy = key.clone();
            key.extend_from_slice(&copy);
        }
    }
    let mut c = Cipher::new(mod95);
    c.reset(0);
    c.process(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cipher_is_an_involution() {
        let stored = encrypt_key(b"secret", false, false);
        let mut data = b"The quick \x00\xff brown fox\n".to_vec();
        let orig = data.clone();
        Cipher::with_key(&stored, false).process(&mut data);
        assert_ne!(data, orig);
        Cipher::with_key(&stored, false).process(&mut data);
        assert_eq!(data, orig);
    }

    #[test]
    fn printable_flavour_preserves_controls() {
        let stored = encrypt_key(b"k", true, false);
        let mut data = b"line one\nline two\n".to_vec();
        Cipher::with_key(&stored, true).process(&mut data);
        // Newlines survive untouched; printable bytes stay printable.
        assert_eq!(data.iter().filter(|&&b| b == b'\n').count(), 2);
        assert!(
            data.iter()
                .all(|&b| b == b'\n' || (0x20..=0x7e).contains(&b))
        );
        Cipher::with_key(&stored, true).process(&mut data);
        assert_eq!(data, b"line one\nline two\n");
    }

    #[test]
    fn different_keys_differ() {
        let mut a = b"same text".to_vec();
        let mut b = b"same text".to_vec();
        Cipher::with_key(&encrypt_key(b"one", false, false), false).process(&mut a);
        Cipher::with_key(&encrypt_key(b"two", false, false), false).process(&mut b);
        assert_ne!(a, b);
    }

    #[test]
    fn fill63_extends_short_keys() {
        let k = encrypt_key(b"ab", false, true);
        assert!(k.len() >= 63);
    }

    #[test]
    fn similar_fill_keys_diverge() {
        let a = encrypt_key(b"!!!!", false, true);
        let b = encrypt_key(b"1111", false, true);
        assert_ne!(a, b);
    }
}
