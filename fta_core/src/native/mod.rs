// Native implementations

pub mod contract;
pub mod profile_api;
pub mod storage_impl;
pub mod telegram;

pub use contract::{wallet_address_from_key, FriendTechContract, FriendTechEventSource};
pub use profile_api::FriendTechApi;
pub use storage_impl::FileStorage;
pub use telegram::TelegramNotifier;
