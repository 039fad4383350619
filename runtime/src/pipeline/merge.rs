use crate::ai::schemas::{CanonicalResult, ProposalDue, QuestionsDeadline};

use super::normalize::{DedupKey, dedupe};

pub const TOTAL_FAILURE_SUMMARY: &str =
    "RFP extraction failed: the model produced no usable output for any chunk.";

/// Folds one normalized chunk into the accumulator.
///
/// Scalars keep the first non-empty value seen; lists are concatenated and
/// de-duplicated in first-seen order. Callers must apply chunks in index order.
pub fn merge(mut accumulator: CanonicalResult, incoming: CanonicalResult) -> CanonicalResult {
    fill_if_empty(&mut accumulator.rfp_title, incoming.rfp_title);
    fill_if_empty(
        &mut accumulator.issuing_organization,
        incoming.issuing_organization,
    );
    fill_if_empty(&mut accumulator.summary_paragraph, incoming.summary_paragraph);

    let deadlines = &mut accumulator.rfp_quick_facts.deadlines;
    let incoming_deadlines = incoming.rfp_quick_facts.deadlines;
    merge_questions_deadline(
        &mut deadlines.questions_deadline,
        incoming_deadlines.questions_deadline,
    );
    merge_proposal_due(&mut deadlines.proposal_due, incoming_deadlines.proposal_due);

    extend_unique(
        &mut accumulator.rfp_quick_facts.pre_bid_presentations,
        incoming.rfp_quick_facts.pre_bid_presentations,
    );

    let mut incoming_checklist = incoming.requirements_checklist;
    for ((_, target), (_, source)) in accumulator
        .requirements_checklist
        .categories_mut()
        .into_iter()
        .zip(incoming_checklist.categories_mut())
    {
        extend_unique(target, std::mem::take(source));
    }
    extend_unique(
        &mut accumulator.requirements_checklist.risks_red_flags,
        incoming_checklist.risks_red_flags,
    );

    extend_unique(
        &mut accumulator.questions_for_client,
        incoming.questions_for_client,
    );
    extend_unique(
        &mut accumulator.missing_information,
        incoming.missing_information,
    );

    accumulator
}

/// Sentinel returned when every chunk failed.
pub fn total_failure() -> CanonicalResult {
    CanonicalResult {
        summary_paragraph: TOTAL_FAILURE_SUMMARY.to_string(),
        ..CanonicalResult::default()
    }
}

fn merge_questions_deadline(target: &mut QuestionsDeadline, incoming: QuestionsDeadline) {
    fill_if_empty(&mut target.date, incoming.date);
    fill_if_empty(&mut target.time, incoming.time);
    fill_if_empty(&mut target.timezone, incoming.timezone);
    fill_if_empty(&mut target.contact_email, incoming.contact_email);
}

fn merge_proposal_due(target: &mut ProposalDue, incoming: ProposalDue) {
    fill_if_empty(&mut target.date, incoming.date);
    fill_if_empty(&mut target.time, incoming.time);
    fill_if_empty(&mut target.timezone, incoming.timezone);
}

fn fill_if_empty(target: &mut String, incoming: String) {
    if target.is_empty() && !incoming.is_empty() {
        *target = incoming;
    }
}

fn extend_unique<T: DedupKey>(target: &mut Vec<T>, incoming: Vec<T>) {
    if incoming.is_empty() {
        return;
    }
    let mut combined = std::mem::take(target);
    combined.extend(incoming);
    *target = dedupe(combined);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::schemas::{PreBidEvent, QuestionItem, RequirementItem, RiskItem, Strength};

    fn titled(title: &str) -> CanonicalResult {
        CanonicalResult {
            rfp_title: title.to_string(),
            ..CanonicalResult::default()
        }
    }

    fn requirement(text: &str, strength: Strength) -> RequirementItem {
        RequirementItem {
            requirement: text.to_string(),
            strength,
            ..RequirementItem::default()
        }
    }

    #[test]
    fn first_non_empty_title_wins() {
        let merged = merge(CanonicalResult::default(), titled("Acme RFP"));
        let merged = merge(merged, titled("Other RFP"));
        assert_eq!(merged.rfp_title, "Acme RFP");
    }

    #[test]
    fn empty_scalars_are_filled_by_later_chunks() {
        let merged = merge(CanonicalResult::default(), titled(""));
        let merged = merge(merged, titled("Late title"));
        assert_eq!(merged.rfp_title, "Late title");
    }

    #[test]
    fn deadline_subfields_merge_independently() {
        let mut first = CanonicalResult::default();
        first.rfp_quick_facts.deadlines.proposal_due.date = "2025-06-01".into();
        let mut second = CanonicalResult::default();
        second.rfp_quick_facts.deadlines.proposal_due.date = "2025-07-01".into();
        second.rfp_quick_facts.deadlines.proposal_due.time = "17:00".into();
        second.rfp_quick_facts.deadlines.questions_deadline.contact_email =
            "bids@example.org".into();

        let merged = merge(merge(CanonicalResult::default(), first), second);
        let deadlines = &merged.rfp_quick_facts.deadlines;
        assert_eq!(deadlines.proposal_due.date, "2025-06-01");
        assert_eq!(deadlines.proposal_due.time, "17:00");
        assert_eq!(deadlines.questions_deadline.contact_email, "bids@example.org");
    }

    #[test]
    fn identical_requirements_across_chunks_collapse() {
        let mut first = CanonicalResult::default();
        first.requirements_checklist.company = vec![requirement("A", Strength::Mandatory)];
        let mut second = CanonicalResult::default();
        second.requirements_checklist.company = vec![
            requirement("a", Strength::Mandatory),
            requirement("A", Strength::Preferred),
        ];

        let merged = merge(merge(CanonicalResult::default(), first), second);
        let company = &merged.requirements_checklist.company;
        assert_eq!(company.len(), 2);
        assert_eq!(company[0].requirement, "A");
        assert_eq!(company[0].strength, Strength::Mandatory);
        assert_eq!(company[1].strength, Strength::Preferred);
    }

    #[test]
    fn lists_preserve_first_seen_order() {
        let mut first = CanonicalResult::default();
        first.requirements_checklist.risks_red_flags = vec![RiskItem {
            risk: "Liquidated damages".into(),
            strength: Strength::Mandatory,
            ..RiskItem::default()
        }];
        first.questions_for_client = vec![QuestionItem {
            question: "Q1".into(),
            why_it_matters: String::new(),
        }];
        let mut second = CanonicalResult::default();
        second.questions_for_client = vec![
            QuestionItem {
                question: "Q2".into(),
                why_it_matters: String::new(),
            },
            QuestionItem {
                question: "q1".into(),
                why_it_matters: "dup".into(),
            },
        ];
        second.rfp_quick_facts.pre_bid_presentations = vec![PreBidEvent {
            title: "Site visit".into(),
            ..PreBidEvent::default()
        }];

        let merged = merge(merge(CanonicalResult::default(), first), second);
        let questions: Vec<&str> = merged
            .questions_for_client
            .iter()
            .map(|q| q.question.as_str())
            .collect();
        assert_eq!(questions, vec!["Q1", "Q2"]);
        assert_eq!(merged.requirements_checklist.risks_red_flags.len(), 1);
        assert_eq!(merged.rfp_quick_facts.pre_bid_presentations.len(), 1);
    }

    #[test]
    fn empty_chunk_leaves_accumulator_unchanged() {
        let accumulator = titled("Acme RFP");
        let merged = merge(accumulator.clone(), CanonicalResult::default());
        assert_eq!(merged, accumulator);
    }

    #[test]
    fn total_failure_sentinel_carries_only_summary() {
        let sentinel = total_failure();
        assert_eq!(sentinel.summary_paragraph, TOTAL_FAILURE_SUMMARY);
        assert!(sentinel.rfp_title.is_empty());
        assert!(sentinel.requirements_checklist.is_empty());
    }
}
