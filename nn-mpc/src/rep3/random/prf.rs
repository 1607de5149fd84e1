use crate::{
    error::Error,
    rep3::{id::PartyID, share::Share},
    types::{int_ring::IntRing2k, ring_element::RingElement},
};
use aes::cipher::{generic_array::GenericArray, KeyIvInit, StreamCipher};
use aes::Aes128;
use rand::{CryptoRng, Rng, RngCore, SeedableRng};
use std::path::Path;

type Aes128Ctr = ctr::Ctr64LE<Aes128>;

pub const KEY_SIZE: usize = 16;
pub type PrfSeed = [u8; KEY_SIZE];

const BUFFER_SIZE: usize = 256;

/// AES-128 in counter mode with a zero nonce, exposed as a [`RngCore`]. Two instances
/// with the same key produce the same byte stream.
pub struct AesRng {
    cipher: Aes128Ctr,
    buffer: [u8; BUFFER_SIZE],
    pos: usize,
}

impl AesRng {
    fn refill(&mut self) {
        self.buffer = [0; BUFFER_SIZE];
        self.cipher.apply_keystream(&mut self.buffer);
        self.pos = 0;
    }
}

impl SeedableRng for AesRng {
    type Seed = PrfSeed;

    fn from_seed(seed: Self::Seed) -> Self {
        let key = GenericArray::from_slice(&seed);
        let nonce = GenericArray::from_slice(&[0u8; 16]);
        Self {
            cipher: Aes128Ctr::new(key, nonce),
            buffer: [0; BUFFER_SIZE],
            pos: BUFFER_SIZE,
        }
    }
}

impl RngCore for AesRng {
    fn next_u32(&mut self) -> u32 {
        let mut bytes = [0u8; 4];
        self.fill_bytes(&mut bytes);
        u32::from_le_bytes(bytes)
    }

    fn next_u64(&mut self) -> u64 {
        let mut bytes = [0u8; 8];
        self.fill_bytes(&mut bytes);
        u64::from_le_bytes(bytes)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut written = 0;
        while written < dest.len() {
            if self.pos == BUFFER_SIZE {
                self.refill();
            }
            let n = (BUFFER_SIZE - self.pos).min(dest.len() - written);
            dest[written..written + n].copy_from_slice(&self.buffer[self.pos..self.pos + n]);
            self.pos += n;
            written += n;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for AesRng {}

/// Key material of one party: a private key and the keys shared with both neighbors.
/// Party i's `next` key equals party (i+1)'s `prev` key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartyKeys {
    pub private: PrfSeed,
    pub next: PrfSeed,
    pub prev: PrfSeed,
}

impl PartyKeys {
    /// Consistent keys for all three parties, as produced by a dealer.
    pub fn generate_all<R: Rng + CryptoRng>(rng: &mut R) -> [PartyKeys; 3] {
        let pairwise: [PrfSeed; 3] = [rng.gen(), rng.gen(), rng.gen()];
        PartyID::ALL.map(|id| PartyKeys {
            private: rng.gen(),
            next: pairwise[usize::from(id)],
            prev: pairwise[usize::from(id.prev_id())],
        })
    }

    pub fn to_hex(key: &PrfSeed) -> String {
        key.iter().map(|b| format!("{:02x}", b)).collect()
    }

    pub fn from_hex(hex: &str) -> Result<PrfSeed, Error> {
        let hex = hex.trim();
        if hex.len() != 2 * KEY_SIZE {
            return Err(Error::ConfigError(format!(
                "AES key must be {} hex characters, got {}",
                2 * KEY_SIZE,
                hex.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        for (i, byte) in key.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[2 * i..2 * i + 2], 16)
                .map_err(|e| Error::ConfigError(format!("invalid AES key: {}", e)))?;
        }
        Ok(key)
    }

    pub fn read_key_file(path: impl AsRef<Path>) -> Result<PrfSeed, Error> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::ConfigError(format!("cannot read key file {}: {}", path.display(), e))
        })?;
        Self::from_hex(&content)
    }
}

/// The three keyed streams of a party.
pub struct Prf {
    private: AesRng,
    with_next: AesRng,
    with_prev: AesRng,
}

impl Prf {
    pub fn new(keys: &PartyKeys) -> Self {
        Self {
            private: AesRng::from_seed(keys.private),
            with_next: AesRng::from_seed(keys.next),
            with_prev: AesRng::from_seed(keys.prev),
        }
    }

    /// One value shared with next, one shared with prev.
    pub(crate) fn gen_rands<T: IntRing2k>(&mut self) -> (RingElement<T>, RingElement<T>) {
        let a = RingElement(T::random(&mut self.with_next));
        let b = RingElement(T::random(&mut self.with_prev));
        (a, b)
    }

    /// The values of all three parties sum to zero.
    pub(crate) fn gen_zero_share<T: IntRing2k>(&mut self) -> RingElement<T> {
        let (a, b) = self.gen_rands::<T>();
        a - b
    }

    /// A replicated sharing of a random value nobody knows.
    pub(crate) fn gen_rand_share<T: IntRing2k>(&mut self) -> Share<T> {
        let (a, b) = self.gen_rands::<T>();
        Share::new(a, b)
    }

    pub(crate) fn gen_private<T: IntRing2k>(&mut self) -> RingElement<T> {
        RingElement(T::random(&mut self.private))
    }

    /// A bit known to us and next, and a bit known to us and prev.
    pub(crate) fn gen_bit_pair(&mut self) -> (bool, bool) {
        (self.with_next.gen(), self.with_prev.gen())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::Zero;
    use rand::rngs::OsRng;

    #[test]
    fn same_key_same_stream() {
        let key = [7u8; KEY_SIZE];
        let mut r1 = AesRng::from_seed(key);
        let mut r2 = AesRng::from_seed(key);
        let a: Vec<u64> = (0..100).map(|_| r1.gen()).collect();
        // Different chunking must not change the stream.
        let mut bytes = [0u8; 800];
        r2.fill_bytes(&mut bytes[..3]);
        r2.fill_bytes(&mut bytes[3..]);
        let b: Vec<u64> = bytes
            .chunks(8)
            .map(|c| u64::from_le_bytes(c.try_into().unwrap()))
            .collect();
        assert_eq!(a, b);

        let mut r3 = AesRng::from_seed([8u8; KEY_SIZE]);
        assert_ne!(r3.gen::<u64>(), a[0]);
    }

    #[test]
    fn zero_and_random_shares() {
        let keys = PartyKeys::generate_all(&mut OsRng);
        let mut prfs: Vec<Prf> = keys.iter().map(Prf::new).collect();

        for _ in 0..10 {
            let z: Vec<RingElement<u64>> =
                prfs.iter_mut().map(|p| p.gen_zero_share::<u64>()).collect();
            assert!((z[0] + z[1] + z[2]).is_zero());

            let r: Vec<Share<u64>> = prfs.iter_mut().map(|p| p.gen_rand_share::<u64>()).collect();
            // party i holds (x_i, x_{i-1})
            for i in 0..3 {
                assert_eq!(r[i].a, r[(i + 1) % 3].b);
            }

            let bits: Vec<(bool, bool)> = prfs.iter_mut().map(|p| p.gen_bit_pair()).collect();
            for i in 0..3 {
                assert_eq!(bits[i].0, bits[(i + 1) % 3].1);
            }
        }
    }

    #[test]
    fn hex_keys() {
        let key = [0xab; KEY_SIZE];
        let hex = PartyKeys::to_hex(&key);
        assert_eq!(hex.len(), 32);
        assert_eq!(PartyKeys::from_hex(&format!("{}\n", hex)).unwrap(), key);
        assert!(PartyKeys::from_hex("abcd").is_err());
        assert!(PartyKeys::from_hex(&"zz".repeat(16)).is_err());
    }
}
