//! Test suites for session supervision.

mod support;
