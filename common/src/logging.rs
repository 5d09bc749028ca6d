use tracing_subscriber::EnvFilter;

/// Inicializa `tracing` hacia stderr. `RUST_LOG` manda; si no está,
/// se usa `default_filter` (p.ej. `"worker=debug,reqwest=info"`).
pub fn init(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    // si ya hay un subscriber global (tests), no pasa nada
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
