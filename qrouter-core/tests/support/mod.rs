use qrouter_core::{MemoryHistory, QueryRouter, RouterConfig};

/// Initialize tracing for tests with proper test output handling
#[allow(dead_code)]
pub fn tracing_init() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_line_number(true)
        .with_target(false)
        .with_file(true)
        .try_init();
}

/// Router with default config over a fresh history at `path`
#[allow(dead_code)]
pub fn router_at(path: &str) -> QueryRouter<MemoryHistory> {
    tracing_init();
    QueryRouter::new(RouterConfig::default(), MemoryHistory::new(path)).unwrap()
}

/// Router with the French markers and the `lieu -> venue` mapper
#[allow(dead_code)]
pub fn french_router_at(path: &str) -> QueryRouter<MemoryHistory> {
    tracing_init();
    let config = RouterConfig::from_yaml_str(
        r#"
mapper:
  lieu: venue
creation_key: nouveau
modification_key: changement
"#,
    )
    .unwrap();
    QueryRouter::new(config, MemoryHistory::new(path)).unwrap()
}
