use serde::Serialize;

/// Horizontal rule the prover prints between report sections.
pub const SECTION_DELIMITER: &str =
    "------------------------------------------------------------\n";

/// Status recorded when a section's last line has no `returns <status>`.
pub const UNKNOWN_STATUS: &str = "Unknown";

const STATUS_MARKER: &str = "returns";

/// A finding parsed out of a report, not yet persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FindingDraft {
    pub category: String,
    pub status: String,
    pub body: String,
}

/// Parse a prover report using the standard section delimiter.
pub fn parse_report(report: &str) -> Vec<FindingDraft> {
    parse_report_with(report, SECTION_DELIMITER)
}

/// Split `report` on `delimiter` and turn every inner segment into a finding.
///
/// The first and last segments are preamble and epilogue and are never
/// findings. Segments with fewer than two lines are dropped. Output order is
/// report order.
pub fn parse_report_with(report: &str, delimiter: &str) -> Vec<FindingDraft> {
    if delimiter.is_empty() {
        return Vec::new();
    }

    let segments: Vec<&str> = report.split(delimiter).collect();
    if segments.len() < 3 {
        return Vec::new();
    }

    segments[1..segments.len() - 1]
        .iter()
        .filter_map(|segment| parse_segment(segment))
        .collect()
}

fn parse_segment(segment: &str) -> Option<FindingDraft> {
    let body = segment.trim();
    let lines: Vec<&str> = body.lines().collect();
    if lines.len() < 2 {
        return None;
    }

    Some(FindingDraft {
        category: parse_category(lines[0]),
        status: parse_status(lines[lines.len() - 1]),
        body: body.to_string(),
    })
}

/// Header text before the first `(`, trimmed, with one trailing `:` removed.
fn parse_category(header: &str) -> String {
    let before_paren = header.split('(').next().unwrap_or(header).trim();
    before_paren
        .strip_suffix(':')
        .unwrap_or(before_paren)
        .to_string()
}

/// Token after the first `returns` on the line, or `Unknown`.
fn parse_status(last_line: &str) -> String {
    let mut tokens = last_line.split_whitespace();
    match tokens.position(|token| token == STATUS_MARKER) {
        Some(_) => tokens
            .next()
            .map(str::to_string)
            .unwrap_or_else(|| UNKNOWN_STATUS.to_string()),
        None => UNKNOWN_STATUS.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WP_REPORT: &str = "\
[kernel] Parsing max.c (with preprocessing)
[wp] Running WP plugin...
------------------------------------------------------------
  Function max
------------------------------------------------------------

Goal Post-condition 'result_ge_x' in 'max':
Assume { Type: is_sint32(x) /\\ is_sint32(y). }
Prove: x <= max(x, y).
Prover Alt-Ergo 2.4.1 returns Valid (Qed:1ms)

------------------------------------------------------------

Goal Assertion 'rte,signed_overflow' (file max.c, line 7):
Prove: (x + y) <= 2147483647.
Prover Z3 4.8.12 returns Timeout (Qed:2ms) (10s)

------------------------------------------------------------
";

    #[test]
    fn test_single_minimal_section() {
        let drafts = parse_report_with("---\nheader A(...): \nline returns OK\n---\n", "---\n");
        assert_eq!(
            drafts,
            vec![FindingDraft {
                category: "header A".to_string(),
                status: "OK".to_string(),
                body: "header A(...): \nline returns OK".to_string(),
            }]
        );
    }

    #[test]
    fn test_missing_returns_gives_unknown_status() {
        let drafts = parse_report_with("pre\n---\nlemma foo:\nno verdict here\n---\npost", "---\n");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].category, "lemma foo");
        assert_eq!(drafts[0].status, UNKNOWN_STATUS);
    }

    #[test]
    fn test_returns_as_last_token_gives_unknown_status() {
        let drafts = parse_report_with("---\nGoal x:\nProver returns\n---\n", "---\n");
        assert_eq!(drafts[0].status, UNKNOWN_STATUS);
    }

    #[test]
    fn test_wp_report_drops_short_sections_and_keeps_order() {
        let drafts = parse_report(WP_REPORT);
        assert_eq!(drafts.len(), 2);

        assert_eq!(drafts[0].category, "Goal Post-condition 'result_ge_x' in 'max'");
        assert_eq!(drafts[0].status, "Valid");
        assert!(drafts[0].body.starts_with("Goal Post-condition"));
        assert!(drafts[0].body.ends_with("returns Valid (Qed:1ms)"));

        assert_eq!(drafts[1].category, "Goal Assertion 'rte,signed_overflow'");
        assert_eq!(drafts[1].status, "Timeout");
    }

    #[test]
    fn test_preamble_and_epilogue_are_never_findings() {
        let report = "Goal A:\nx returns Valid\n---\nGoal B:\ny returns Valid\n";
        assert!(parse_report_with(report, "---\n").is_empty());
        assert!(parse_report("").is_empty());
        assert!(parse_report("no delimiter at all\nreturns Valid").is_empty());
    }

    #[test]
    fn test_colon_stripped_only_once() {
        let drafts = parse_report_with("---\nGoal::\nreturns Valid\n---\n", "---\n");
        assert_eq!(drafts[0].category, "Goal:");
    }

    #[test]
    fn test_header_without_paren_uses_whole_line() {
        let drafts = parse_report_with("---\n  Goal Assigns nothing  \nreturns Unknown\n---\n", "---\n");
        assert_eq!(drafts[0].category, "Goal Assigns nothing");
        assert_eq!(drafts[0].status, "Unknown");
    }

    #[test]
    fn test_empty_inner_segments_dropped() {
        let drafts = parse_report_with("---\n\n---\n   \n---\nA:\nreturns Valid\n---\n", "---\n");
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].category, "A");
    }

    #[test]
    fn test_no_draft_has_fewer_than_two_lines() {
        let report = "p\n---\none line\n---\ntwo\nlines\n---\n\n\n---\nthree\nline\nreturns X\n---\ne";
        let drafts = parse_report_with(report, "---\n");
        assert_eq!(drafts.len(), 2);
        assert!(drafts.iter().all(|d| d.body.lines().count() >= 2));
        assert_eq!(drafts[0].category, "two");
        assert_eq!(drafts[1].status, "X");
    }

    #[test]
    fn test_parse_is_deterministic() {
        assert_eq!(parse_report(WP_REPORT), parse_report(WP_REPORT));
    }
}
