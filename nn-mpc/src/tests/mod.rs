mod comm;
mod desync;
mod malicious;
mod network_tcp;
pub(crate) mod test_config;
