use super::int_ring::IntRing2k;
use crate::error::Error;
use bytes::BytesMut;
use num_traits::{One, Zero};
use rand::{distributions::Standard, prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};
use sha2::Digest;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Shl, Shr, Sub, SubAssign};

/// An element of Z_{2^K}. All arithmetic wraps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(bound = "")]
#[repr(transparent)]
pub struct RingElement<T: IntRing2k>(pub T);

impl<T: IntRing2k> RingElement<T> {
    pub fn convert(self) -> T {
        self.0
    }

    pub fn get_bit(&self, index: usize) -> bool {
        self.0.get_bit(index)
    }

    pub fn add_to_bytes(self, other: &mut BytesMut) {
        self.0.add_to_bytes(other)
    }

    pub fn take_from_bytes_mut(other: &mut BytesMut) -> Result<Self, Error> {
        Ok(RingElement(T::take_from_bytes_mut(other)?))
    }

    pub fn add_to_hash<D: Digest>(&self, hasher: &mut D) {
        self.0.add_to_hash(hasher)
    }

    pub fn downgrade(value: RingElement<u128>) -> Self {
        RingElement(T::downgrade_from_128(value.0))
    }
}

impl<T: IntRing2k> std::fmt::Display for RingElement<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl<T: IntRing2k> From<bool> for RingElement<T> {
    fn from(value: bool) -> Self {
        RingElement(T::from(value))
    }
}

// value and reference right hand sides, all wrapping
macro_rules! ring_op {
    ($op:ident, $f:ident, $op_assign:ident, $f_assign:ident, $wrapping:ident) => {
        impl<T: IntRing2k> $op for RingElement<T> {
            type Output = Self;

            fn $f(self, rhs: Self) -> Self {
                Self(self.0.$wrapping(&rhs.0))
            }
        }

        impl<T: IntRing2k> $op<&Self> for RingElement<T> {
            type Output = Self;

            fn $f(self, rhs: &Self) -> Self {
                Self(self.0.$wrapping(&rhs.0))
            }
        }

        impl<T: IntRing2k> $op_assign for RingElement<T> {
            fn $f_assign(&mut self, rhs: Self) {
                *self = $op::$f(*self, rhs);
            }
        }

        impl<T: IntRing2k> $op_assign<&Self> for RingElement<T> {
            fn $f_assign(&mut self, rhs: &Self) {
                *self = $op::$f(*self, rhs);
            }
        }
    };
}

ring_op!(Add, add, AddAssign, add_assign, wrapping_add);
ring_op!(Sub, sub, SubAssign, sub_assign, wrapping_sub);
ring_op!(Mul, mul, MulAssign, mul_assign, wrapping_mul);

impl<T: IntRing2k> Neg for RingElement<T> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self(self.0.wrapping_neg())
    }
}

/// Logical shift, the ring is unsigned.
impl<T: IntRing2k> Shr<u32> for RingElement<T> {
    type Output = Self;

    fn shr(self, rhs: u32) -> Self::Output {
        RingElement(self.0.wrapping_shr(rhs))
    }
}

impl<T: IntRing2k> Shl<u32> for RingElement<T> {
    type Output = Self;

    fn shl(self, rhs: u32) -> Self::Output {
        RingElement(self.0.wrapping_shl(rhs))
    }
}

impl<T: IntRing2k> Zero for RingElement<T> {
    fn zero() -> Self {
        Self(T::zero())
    }

    fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl<T: IntRing2k> One for RingElement<T> {
    fn one() -> Self {
        Self(T::one())
    }
}

impl<T: IntRing2k> Distribution<RingElement<T>> for Standard {
    #[inline(always)]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> RingElement<T> {
        RingElement(T::random(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_wraps() {
        let max = RingElement(u64::MAX);
        assert_eq!(max + RingElement(1), RingElement(0));
        assert_eq!(RingElement(0u64) - RingElement(1), max);
        assert_eq!(-RingElement(1u64), max);
        assert_eq!(RingElement(1u64 << 63) * RingElement(2), RingElement(0));
        assert_eq!(max >> 60, RingElement(15));
    }

    #[test]
    fn downgrade_of_wide_product() {
        let x = RingElement(u64::MAX - 3);
        let wide = RingElement((u64::MAX - 3) as u128);
        assert_eq!(RingElement::<u64>::downgrade(wide * wide), x * x);
    }
}
