pub mod dto;
pub mod imaging;
pub mod ports;
pub mod services;
pub mod worker_pool;

#[cfg(test)]
pub mod testing;
