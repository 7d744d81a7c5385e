//! Property-based tests for masks and entry ordering.
