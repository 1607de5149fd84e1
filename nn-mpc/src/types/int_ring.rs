use crate::error::Error;
use bytes::{Buf, BufMut, BytesMut};
use num_traits::{
    One, WrappingAdd, WrappingMul, WrappingNeg, WrappingShl, WrappingShr, WrappingSub, Zero,
};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::{fmt::Debug, mem::size_of};

/// Unsigned integers used as the ring Z_{2^K}.
pub trait IntRing2k:
    Sized
    + Send
    + Sync
    + Copy
    + PartialEq
    + Eq
    + Debug
    + std::fmt::Display
    + WrappingAdd<Output = Self>
    + WrappingSub<Output = Self>
    + WrappingMul<Output = Self>
    + WrappingNeg
    + WrappingShl
    + WrappingShr
    + std::ops::BitAnd<Output = Self>
    + Zero
    + One
    + From<bool>
    + Default
    + Ord
    + Serialize
    + for<'a> Deserialize<'a>
    + 'static
{
    const K: usize;
    const BYTES: usize;

    /// Reduces a u128 modulo 2^K.
    fn downgrade_from_128(value: u128) -> Self;

    fn add_to_bytes(self, other: &mut BytesMut);
    fn take_from_bytes_mut(other: &mut BytesMut) -> Result<Self, Error>;

    fn add_to_hash<D: Digest>(&self, hasher: &mut D);

    fn random<R: Rng + ?Sized>(rng: &mut R) -> Self;

    fn get_bit(&self, index: usize) -> bool {
        (self.wrapping_shr(index as u32) & Self::one()) == Self::one()
    }
}

macro_rules! int_ring_impl {
    ($($t:ty, $put:ident, $get:ident);*) => {
        $(
            impl IntRing2k for $t {
                const K: usize = <$t>::BITS as usize;
                const BYTES: usize = size_of::<$t>();

                #[inline(always)]
                fn downgrade_from_128(value: u128) -> Self {
                    value as $t
                }

                fn add_to_bytes(self, other: &mut BytesMut) {
                    other.$put(self);
                }

                fn take_from_bytes_mut(other: &mut BytesMut) -> Result<Self, Error> {
                    if other.remaining() < size_of::<Self>() {
                        return Err(Error::ProtocolDesync(format!(
                            "buffer ended while reading a {}-bit ring element",
                            Self::K
                        )));
                    }
                    Ok(other.$get())
                }

                fn add_to_hash<D: Digest>(&self, hasher: &mut D) {
                    hasher.update(self.to_le_bytes());
                }

                #[inline(always)]
                fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
                    rng.gen()
                }
            }
        )*
    };
}

int_ring_impl!(u64, put_u64, get_u64; u128, put_u128, get_u128);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downgrade_reduces_mod_2k() {
        let x = (5u128 << 64) | 17;
        assert_eq!(u64::downgrade_from_128(x), 17);
        assert_eq!(u64::downgrade_from_128(u128::MAX), u64::MAX);
        assert_eq!(u128::downgrade_from_128(x), x);
    }

    #[test]
    fn short_buffer_is_a_desync() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[7, 0, 0, 0]);
        assert!(matches!(
            u64::take_from_bytes_mut(&mut buf),
            Err(Error::ProtocolDesync(_))
        ));
    }

    #[test]
    fn bits() {
        let x = 0b1010u64;
        assert!(!x.get_bit(0));
        assert!(x.get_bit(1));
        assert!(x.get_bit(3));
        assert!(!x.get_bit(63));
        assert!((1u64 << 63).get_bit(63));
    }
}
