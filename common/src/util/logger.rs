use env_logger::Env;

/// Initialise logging once for the process. Defaults to `info` unless
/// RUST_LOG overrides it; repeated calls are harmless.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
