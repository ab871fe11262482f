use std::collections::BTreeMap;

use crate::diagnostics::{Diagnostic, DiagnosticKind, Severity};
use crate::{DiagnosticSummary, MAX_DIAGNOSTIC_EXAMPLES};

struct KindStats {
    severity: Severity,
    count: u64,
    examples: Vec<String>,
}

pub(crate) fn build_diagnostic_summaries(diagnostics: &[Diagnostic]) -> Vec<DiagnosticSummary> {
    let mut by_kind: BTreeMap<DiagnosticKind, KindStats> = BTreeMap::new();
    for diagnostic in diagnostics {
        let stats = by_kind.entry(diagnostic.kind).or_insert(KindStats {
            severity: diagnostic.severity,
            count: 0,
            examples: Vec::new(),
        });
        stats.severity = stats.severity.max(diagnostic.severity);
        stats.count += 1;
        if stats.examples.len() < MAX_DIAGNOSTIC_EXAMPLES {
            stats
                .examples
                .push(format!("{}: {}", diagnostic.location(), diagnostic.message));
        }
    }

    let mut summaries: Vec<(Severity, DiagnosticSummary)> = by_kind
        .into_iter()
        .map(|(kind, stats)| {
            (
                stats.severity,
                DiagnosticSummary {
                    id: kind.id().to_string(),
                    severity: stats.severity.to_string(),
                    message: kind.description().to_string(),
                    count: stats.count,
                    examples: stats.examples,
                },
            )
        })
        .collect();
    summaries.sort_by(|(sev_a, a), (sev_b, b)| sev_b.cmp(sev_a).then_with(|| a.id.cmp(&b.id)));
    summaries.into_iter().map(|(_, summary)| summary).collect()
}

#[cfg(test)]
mod tests {
    use super::build_diagnostic_summaries;
    use crate::diagnostics::{Diagnostic, DiagnosticKind};

    #[test]
    fn aggregates_by_kind_with_three_examples() {
        let diagnostics: Vec<Diagnostic> = (1..=5)
            .map(|frame| {
                Diagnostic::new(
                    DiagnosticKind::UnknownOperation,
                    frame,
                    0..4,
                    format!("unknown operation code {frame}"),
                )
            })
            .collect();
        let summaries = build_diagnostic_summaries(&diagnostics);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].count, 5);
        assert_eq!(
            summaries[0].examples,
            vec![
                "frame 1 bytes 0..4: unknown operation code 1",
                "frame 2 bytes 0..4: unknown operation code 2",
                "frame 3 bytes 0..4: unknown operation code 3",
            ]
        );
    }

    #[test]
    fn errors_sort_before_warnings_then_by_id() {
        let diagnostics = vec![
            Diagnostic::new(DiagnosticKind::UnresolvedIdentifier, 1, 0..1, "a"),
            Diagnostic::new(DiagnosticKind::TrailingData, 2, 0..1, "b"),
            Diagnostic::new(DiagnosticKind::StructuralDecodeStall, 3, 0..1, "c"),
        ];
        let ids: Vec<String> = build_diagnostic_summaries(&diagnostics)
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(
            ids,
            vec!["RS-DECODE-STALL", "RS-TRAILING-DATA", "RS-UNRESOLVED-IDENTIFIER"]
        );
    }
}
