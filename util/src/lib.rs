pub mod settings;

pub fn maybe_print_version(
    name: &'static str,
    major: &'static str,
    minor: &'static str,
    patch: &'static str,
    pre: &'static str,
) {
    let mut args = std::env::args();
    if args.len() == 2 && args.nth(1).as_deref() == Some("--version") {
        println!("{} {}.{}.{} {}", name, major, minor, patch, pre);
        std::process::exit(0);
    }
}

#[macro_export]
macro_rules! add_version {
    () => {
        p12_util::maybe_print_version(
            env!("CARGO_PKG_NAME"),
            env!("CARGO_PKG_VERSION_MAJOR"),
            env!("CARGO_PKG_VERSION_MINOR"),
            env!("CARGO_PKG_VERSION_PATCH"),
            env!("CARGO_PKG_VERSION_PRE"),
        );
    };
}

/// Sets up logging for binaries, filtered by the `LOG_LEVEL` environment variable.
pub fn init_logging() {
    pretty_env_logger::init_custom_env("LOG_LEVEL");
}
