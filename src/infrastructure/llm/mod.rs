pub mod asi_client;

pub use asi_client::{Anonymizer, AsiClient};
