use super::{id::PartyID, share::Share};
use crate::{
    error::Error,
    types::{int_ring::IntRing2k, ring_element::RingElement},
};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// A secret-shared vector. Element `i` corresponds to tensor index `i`.
// share x = x0 + x1 + x2 where party i has (xi, x{i-1})
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(bound = "", try_from = "VecShareHalves<T>")]
pub struct VecShare<T: IntRing2k> {
    pub(crate) a: Vec<RingElement<T>>,
    pub(crate) b: Vec<RingElement<T>>,
}

#[derive(Deserialize)]
#[serde(bound = "")]
struct VecShareHalves<T: IntRing2k> {
    a: Vec<RingElement<T>>,
    b: Vec<RingElement<T>>,
}

impl<T: IntRing2k> TryFrom<VecShareHalves<T>> for VecShare<T> {
    type Error = Error;

    fn try_from(halves: VecShareHalves<T>) -> Result<Self, Error> {
        Self::new(halves.a, halves.b)
    }
}

impl<T: IntRing2k> VecShare<T> {
    pub fn new(a: Vec<RingElement<T>>, b: Vec<RingElement<T>>) -> Result<Self, Error> {
        if a.len() != b.len() {
            return Err(Error::InvalidSizeError);
        }
        Ok(Self { a, b })
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            a: Vec::with_capacity(capacity),
            b: Vec::with_capacity(capacity),
        }
    }

    pub fn zero(len: usize) -> Self {
        Self {
            a: vec![RingElement::zero(); len],
            b: vec![RingElement::zero(); len],
        }
    }

    /// Shares of public values, no randomness involved.
    pub(crate) fn from_public(values: &[RingElement<T>], id: PartyID) -> Self {
        let mut res = Self::zero(values.len());
        res.add_assign_const_many(values, id);
        res
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.a.len(), self.b.len());
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }

    pub fn get_ab(self) -> (Vec<RingElement<T>>, Vec<RingElement<T>>) {
        (self.a, self.b)
    }

    pub fn push(&mut self, value: Share<T>) {
        let (a, b) = value.get_ab();
        self.a.push(a);
        self.b.push(b);
    }

    pub fn extend(&mut self, other: Self) {
        let (a, b) = other.get_ab();
        self.a.extend(a);
        self.b.extend(b);
    }

    pub fn get_at(&self, index: usize) -> Share<T> {
        Share::new(self.a[index], self.b[index])
    }

    pub fn set_at(&mut self, index: usize, value: Share<T>) {
        self.a[index] = value.a;
        self.b[index] = value.b;
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Share<T>> + '_ {
        self.a
            .iter()
            .zip(self.b.iter())
            .map(|(a, b)| Share::new(*a, *b))
    }

    /// Removes the last `n` elements and returns them in order.
    pub(crate) fn split_off_back(&mut self, n: usize) -> Self {
        let at = self.len() - n;
        Self {
            a: self.a.split_off(at),
            b: self.b.split_off(at),
        }
    }

    pub fn slice(&self, start: usize, end: usize) -> Self {
        Self {
            a: self.a[start..end].to_vec(),
            b: self.b[start..end].to_vec(),
        }
    }

    /// Builds a new vector from the given positions; `None` yields a share of zero.
    pub(crate) fn gather(&self, indices: &[Option<usize>]) -> Self {
        let mut res = Self::with_capacity(indices.len());
        for index in indices {
            match index {
                Some(i) => res.push(self.get_at(*i)),
                None => res.push(Share::zero()),
            }
        }
        res
    }

    /// Adds `self[i]` onto `target[indices[i]]`, skipping `None`.
    pub(crate) fn scatter_add(&self, indices: &[Option<usize>], target: &mut Self) {
        debug_assert_eq!(indices.len(), self.len());
        for (i, index) in indices.iter().enumerate() {
            if let Some(j) = index {
                target.a[*j] += self.a[i];
                target.b[*j] += self.b[i];
            }
        }
    }

    /// Interprets self as a row-major `rows x cols` matrix and transposes it.
    pub(crate) fn transpose(&self, rows: usize, cols: usize) -> Self {
        debug_assert_eq!(rows * cols, self.len());
        let mut res = Self::zero(self.len());
        for r in 0..rows {
            for c in 0..cols {
                res.a[c * rows + r] = self.a[r * cols + c];
                res.b[c * rows + r] = self.b[r * cols + c];
            }
        }
        res
    }

    pub fn add(&self, other: &Self) -> Result<Self, Error> {
        if self.len() != other.len() {
            return Err(Error::InvalidSizeError);
        }
        let mut res = self.to_owned();
        res.add_assign(other)?;
        Ok(res)
    }

    pub fn add_assign(&mut self, other: &Self) -> Result<(), Error> {
        if self.len() != other.len() {
            return Err(Error::InvalidSizeError);
        }
        for (a, b) in self.a.iter_mut().zip(other.a.iter()) {
            *a += b;
        }
        for (a, b) in self.b.iter_mut().zip(other.b.iter()) {
            *a += b;
        }
        Ok(())
    }

    pub fn sub(&self, other: &Self) -> Result<Self, Error> {
        if self.len() != other.len() {
            return Err(Error::InvalidSizeError);
        }
        let a = self.a.iter().zip(other.a.iter()).map(|(x, y)| *x - y).collect();
        let b = self.b.iter().zip(other.b.iter()).map(|(x, y)| *x - y).collect();
        Ok(Self { a, b })
    }

    pub fn neg(&self) -> Self {
        Self {
            a: self.a.iter().map(|x| -*x).collect(),
            b: self.b.iter().map(|x| -*x).collect(),
        }
    }

    pub fn mul_public(&self, scalar: RingElement<T>) -> Self {
        Self {
            a: self.a.iter().map(|x| *x * scalar).collect(),
            b: self.b.iter().map(|x| *x * scalar).collect(),
        }
    }

    pub(crate) fn add_assign_const_many(&mut self, values: &[RingElement<T>], id: PartyID) {
        debug_assert_eq!(values.len(), self.len());
        match id {
            PartyID::ID0 => self.a.iter_mut().zip(values).for_each(|(x, v)| *x += v),
            PartyID::ID1 => self.b.iter_mut().zip(values).for_each(|(x, v)| *x += v),
            PartyID::ID2 => {}
        }
    }

    /// Adds a public row vector of length `cols` to every row of a `rows x cols` matrix.
    pub(crate) fn add_row_broadcast(&mut self, row: &Self, rows: usize) -> Result<(), Error> {
        let cols = row.len();
        if rows * cols != self.len() {
            return Err(Error::InvalidSizeError);
        }
        for r in 0..rows {
            for c in 0..cols {
                self.a[r * cols + c] += row.a[c];
                self.b[r * cols + c] += row.b[c];
            }
        }
        Ok(())
    }

    /// Sums the rows of a `rows x cols` matrix.
    pub(crate) fn sum_rows(&self, rows: usize) -> Self {
        let cols = self.len() / rows.max(1);
        let mut res = Self::zero(cols);
        for r in 0..rows {
            for c in 0..cols {
                res.a[c] += self.a[r * cols + c];
                res.b[c] += self.b[r * cols + c];
            }
        }
        res
    }

    pub(crate) fn downgrade(other: VecShare<u128>) -> Self {
        Self {
            a: other.a.into_iter().map(RingElement::downgrade).collect(),
            b: other.b.into_iter().map(RingElement::downgrade).collect(),
        }
    }
}

impl<T: IntRing2k> FromIterator<Share<T>> for VecShare<T> {
    fn from_iter<I: IntoIterator<Item = Share<T>>>(iter: I) -> Self {
        let mut res = Self::with_capacity(0);
        for share in iter {
            res.push(share);
        }
        res
    }
}
