use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Install the fmt subscriber used by the workflow. Returns `false` when a
/// global subscriber was already set, which leaves the existing one in place.
pub fn init_tracing(level: Level) -> bool {
    let filter = EnvFilter::new(format!(
        "overlay_workflow={},ort=off",
        level.as_str().to_lowercase()
    ));

    tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        let _ = init_tracing(Level::DEBUG);
        assert!(!init_tracing(Level::INFO));
    }
}
