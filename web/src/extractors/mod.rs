pub(crate) mod client_addr;
