pub mod prf;
