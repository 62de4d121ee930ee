use tracing::subscriber::set_global_default;
use tracing::Subscriber;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

/// Build the subscriber for the announcer.
///
/// `RUST_LOG`, when set, wins over the CLI-derived filter. Output goes to stderr:
/// stdout belongs to the supervised child.
pub fn get_subscriber(env_filter: String) -> impl Subscriber + Send + Sync {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    Registry::default().with(env_filter).with(formatting_layer)
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    // Redirect all `log` events to the tracing subscriber.
    LogTracer::init().expect("Failed to set logger.");
    set_global_default(subscriber).expect("Failed to set subscriber.");
}

/// Map the repeatable `-v` flag to a filter directive for the announcer targets.
pub fn verbosity_filter(verbose: u8) -> String {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    format!("warn,announcer={level},consul_announcer={level}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_levels() {
        assert!(verbosity_filter(0).contains("announcer=warn"));
        assert!(verbosity_filter(1).contains("announcer=info"));
        assert!(verbosity_filter(2).contains("announcer=debug"));
        assert!(verbosity_filter(5).contains("announcer=debug"));
    }
}
