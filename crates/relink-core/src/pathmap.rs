use crate::config::PathMapRule;
use tracing::debug;

/// Rewrite a stale path prefix before any filesystem check. Rules are
/// tried in configured order; the first whose `from` is a prefix of the
/// path fires, and at most one rule is applied.
pub fn normalize(path: &str, rules: &[PathMapRule]) -> String {
    for rule in rules {
        if let Some(rest) = path.strip_prefix(rule.from.as_str()) {
            let mapped = format!("{}{}", rule.to, rest);
            debug!(
                "Path remapped by rule {} -> {}: {}",
                rule.from, rule.to, mapped
            );
            return mapped;
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(from: &str, to: &str) -> PathMapRule {
        PathMapRule {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    #[test]
    fn test_first_matching_rule_wins() {
        // The rewritten path is not fed back through later rules.
        let rules = vec![rule("A", "B"), rule("B", "C")];
        assert_eq!(normalize("A/x", &rules), "B/x");
    }

    #[test]
    fn test_rules_tried_in_order() {
        let rules = vec![rule("/mnt/old", "/mnt/new"), rule("/mnt", "/data")];
        assert_eq!(normalize("/mnt/old/report.pdf", &rules), "/mnt/new/report.pdf");
        assert_eq!(normalize("/mnt/other/report.pdf", &rules), "/data/other/report.pdf");
    }

    #[test]
    fn test_no_matching_rule_is_passthrough() {
        let rules = vec![rule("/mnt/old", "/mnt/new")];
        assert_eq!(normalize("/srv/report.pdf", &rules), "/srv/report.pdf");
    }

    #[test]
    fn test_empty_rule_set_is_passthrough() {
        assert_eq!(normalize("/srv/report.pdf", &[]), "/srv/report.pdf");
    }
}
