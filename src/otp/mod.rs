pub mod generator;
pub mod store;
pub mod verify;

pub use generator::generate_otp;
pub use store::{spawn_sweeper, OtpPurpose, OtpRecord, OtpStore};
pub use verify::{VerifyOutcome, MAX_ATTEMPTS};
