pub mod fixed_point;
pub(crate) mod int_ring;
pub(crate) mod ring_element;
