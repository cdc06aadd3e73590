pub mod nonce_tracker;

pub use nonce_tracker::NonceTracker;
