use rand::Rng;

/// Generate a 6-digit one-time passcode, uniform over 100000..=999999.
///
/// `thread_rng` is a CSPRNG seeded from the operating system; if the OS
/// entropy source is unavailable it panics rather than degrading to a
/// weaker generator.
pub fn generate_otp() -> String {
    let code: u32 = rand::thread_rng().gen_range(100_000..=999_999);
    code.to_string()
}
