pub(crate) mod network_trait;
pub(crate) mod test_network;
