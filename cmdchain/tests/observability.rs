//! Global subscriber installation.
//!
//! Kept in its own test binary: installing a subscriber is process-wide.

use cmdchain::observability::{init_json_tracing, init_tracing};

#[test]
fn second_install_is_an_error() {
    init_tracing("cmdchain=debug").unwrap();

    assert!(init_json_tracing("cmdchain=debug").is_err());
    assert!(init_tracing("info").is_err());
}
