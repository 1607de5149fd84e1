pub(crate) mod comm;
pub(crate) mod compare;
pub(crate) mod id;
pub(crate) mod linalg;
pub(crate) mod network;
pub(crate) mod precompute;
pub(crate) mod protocol;
pub(crate) mod random;
pub(crate) mod share;
pub(crate) mod utils;
pub(crate) mod vecshare;
pub(crate) mod verify;
