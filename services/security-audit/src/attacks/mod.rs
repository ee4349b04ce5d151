pub mod replay;
pub mod double_spend;
pub mod flood;
pub mod slow_client;
pub mod invalid_signer;
pub mod nonce_collision;
pub mod privilege;
pub mod race_condition;
