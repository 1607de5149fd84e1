use super::id::PartyID;
use crate::types::{int_ring::IntRing2k, ring_element::RingElement};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// share x = x0 + x1 + x2 where party i has (xi, x{i-1})
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(bound = "")]
pub struct Share<T: IntRing2k> {
    pub(crate) a: RingElement<T>,
    pub(crate) b: RingElement<T>,
}

impl<T: IntRing2k> Share<T> {
    pub fn new(a: RingElement<T>, b: RingElement<T>) -> Self {
        Share { a, b }
    }

    pub fn get_ab(self) -> (RingElement<T>, RingElement<T>) {
        (self.a, self.b)
    }

    /// Shares a public constant without any randomness.
    pub(crate) fn from_public(value: RingElement<T>, id: PartyID) -> Self {
        Self::zero().add_const(value, id)
    }

    pub(crate) fn add_const(mut self, other: RingElement<T>, id: PartyID) -> Self {
        self.add_assign_const(other, id);
        self
    }

    pub(crate) fn add_assign_const(&mut self, other: RingElement<T>, id: PartyID) {
        match id {
            PartyID::ID0 => self.a += other,
            PartyID::ID1 => self.b += other,
            PartyID::ID2 => {}
        }
    }

    /// This is only the local part of the multiplication (so without randomness and without communication)!
    pub(crate) fn mul_local(&self, rhs: &Self) -> RingElement<T> {
        self.a * rhs.a + self.a * rhs.b + self.b * rhs.a
    }
}

impl<T: IntRing2k> Add for Share<T> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Share::new(self.a + rhs.a, self.b + rhs.b)
    }
}

impl<T: IntRing2k> AddAssign for Share<T> {
    fn add_assign(&mut self, rhs: Self) {
        self.a += rhs.a;
        self.b += rhs.b;
    }
}

impl<T: IntRing2k> Sub for Share<T> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Share::new(self.a - rhs.a, self.b - rhs.b)
    }
}

impl<T: IntRing2k> SubAssign for Share<T> {
    fn sub_assign(&mut self, rhs: Self) {
        self.a -= rhs.a;
        self.b -= rhs.b;
    }
}

impl<T: IntRing2k> Neg for Share<T> {
    type Output = Self;

    fn neg(self) -> Self {
        Share::new(-self.a, -self.b)
    }
}

/// Multiplication with a public value, fully local.
impl<T: IntRing2k> Mul<RingElement<T>> for Share<T> {
    type Output = Self;

    fn mul(self, rhs: RingElement<T>) -> Self::Output {
        Share::new(self.a * rhs, self.b * rhs)
    }
}

impl<T: IntRing2k> Zero for Share<T> {
    fn zero() -> Self {
        Share::new(RingElement::zero(), RingElement::zero())
    }

    fn is_zero(&self) -> bool {
        self.a.is_zero() && self.b.is_zero()
    }
}
