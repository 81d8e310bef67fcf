/// Build version; CI may stamp a release tag through `APP_VERSION`.
pub const VERSION: &str = match option_env!("APP_VERSION") {
    Some(tag) => tag,
    None => env!("CARGO_PKG_VERSION"),
};

/// `User-Agent` sent with every probe.
pub fn user_agent() -> String {
    format!("serverstat/{VERSION}")
}
