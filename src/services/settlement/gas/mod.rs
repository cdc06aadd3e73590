pub mod gas_policy;

pub use gas_policy::GasPolicy;
