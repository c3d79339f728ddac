// Intentionally empty: this crate exists only to host workspace-level
// integration tests via its [dev-dependencies].
