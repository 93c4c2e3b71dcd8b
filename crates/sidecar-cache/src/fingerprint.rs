//! Builds the `handler_name(arg1, arg2, k=v, …)` fingerprint (§4.2) that a
//! route's positional and keyword arguments hash to.

/// Renders a deterministic fingerprint for a route invocation.
///
/// Positional args come first, then keyword args in insertion order, each
/// stringified by its natural `Display` form — mirroring the upstream
/// sidecar's `get_method_signature`, which calls `str()` on every argument.
pub fn fingerprint(handler_name: &str, positional: &[&dyn std::fmt::Display], keyword: &[(&str, &dyn std::fmt::Display)]) -> String {
    let mut parts = Vec::with_capacity(positional.len() + keyword.len());
    for arg in positional {
        parts.push(arg.to_string());
    }
    for (key, value) in keyword {
        parts.push(format!("{key}={value}"));
    }
    format!("{handler_name}({})", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_only() {
        assert_eq!(fingerprint("get_block_by_height", &[&100u64], &[]), "get_block_by_height(100)");
    }

    #[test]
    fn keyword_only() {
        assert_eq!(
            fingerprint("get_transaction", &[], &[("tx_hash", &"0xabc" as &dyn std::fmt::Display)]),
            "get_transaction(tx_hash=0xabc)"
        );
    }

    #[test]
    fn positional_then_keyword() {
        let height = 42u64;
        let include_txs = true;
        let got = fingerprint(
            "get_block",
            &[&height],
            &[("include_txs", &include_txs as &dyn std::fmt::Display)],
        );
        assert_eq!(got, "get_block(42, include_txs=true)");
    }

    #[test]
    fn no_args_renders_empty_parens() {
        assert_eq!(fingerprint("get_block_latest", &[], &[]), "get_block_latest()");
    }
}
