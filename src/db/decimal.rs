// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Exact decimal text for floating-point values persisted in Firestore.
//!
//! Floats are stored as their shortest round-trip decimal string so the
//! stored value reads back bit-for-bit and never picks up binary noise.

/// Format `value` as the shortest decimal string that parses back to the
/// same `f64`. Returns `None` for NaN and infinities.
pub fn exact_decimal(value: f64) -> Option<String> {
    value.is_finite().then(|| format!("{}", value))
}

/// Parse a decimal string written by [`exact_decimal`].
pub fn parse_decimal(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}
