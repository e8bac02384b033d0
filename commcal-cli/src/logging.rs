use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_DIRECTIVES: &str = "commcal=info,commcal_core=info";
const VERBOSE_DIRECTIVES: &str = "commcal=debug,commcal_core=debug";

/// Install the global subscriber. `RUST_LOG` wins over `-v`.
///
/// Logs go to stderr so `commcal json` can stream to stdout.
pub fn init_logging(verbose: bool) {
    let default = if verbose { VERBOSE_DIRECTIVES } else { DEFAULT_DIRECTIVES };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .init();
}
