//! Contract interfaces used by the chain collaborator.

pub mod erc20;
pub mod factory;
pub mod masterchef;
pub mod pair;
