pub mod otp;

pub use otp::AppState;
