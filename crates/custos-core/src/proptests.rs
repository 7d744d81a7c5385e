//! Property-based tests for identity types.
