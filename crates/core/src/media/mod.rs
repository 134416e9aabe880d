pub mod codecs;
pub mod transport;
pub mod worker_pool;
