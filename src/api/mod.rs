//! Clients for services outside this process.

pub mod payment_gateway;
