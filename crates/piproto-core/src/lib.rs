pub mod constants;
pub mod error;
pub mod types;
pub mod ledger;
pub mod account;
pub mod referral;

pub use constants::*;
pub use error::PiprotoError;
pub use types::*;
pub use ledger::*;
pub use account::*;
pub use referral::*;
