//! Coerces untrusted per-chunk model output into the canonical schema.
//!
//! Every incoming value is treated as untyped JSON and each record is rebuilt
//! field by field. Nothing here fails: unexpected shapes degrade to empty
//! values so the output always carries every canonical key.

use std::collections::HashSet;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::ai::schemas::{
    Attendance, CANONICAL_KEYS, CanonicalResult, Deadlines, MissingInfoItem, PreBidEvent,
    ProposalDue, QuestionItem, QuestionsDeadline, QuickFacts, RequirementItem,
    RequirementsChecklist, RiskItem, Strength,
};

const EMPTY_TOKENS: [&str; 4] = ["", "none", "n/a", "na"];
const EVIDENCE_MIN_WORDS: usize = 6;
const EVIDENCE_MAX_WORDS: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaMatch {
    Recognized,
    Unrecognized,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Normalized {
    pub result: CanonicalResult,
    pub schema: SchemaMatch,
}

/// Items that collapse onto one entry when their dedup keys collide.
pub trait DedupKey {
    /// `None` means the record is unusable and must be dropped.
    fn dedup_key(&self) -> Option<String>;
}

impl DedupKey for RequirementItem {
    fn dedup_key(&self) -> Option<String> {
        checklist_key(&self.requirement, self.strength)
    }
}

impl DedupKey for RiskItem {
    fn dedup_key(&self) -> Option<String> {
        checklist_key(&self.risk, self.strength)
    }
}

impl DedupKey for PreBidEvent {
    fn dedup_key(&self) -> Option<String> {
        let is_blank = self.title.is_empty()
            && self.date.is_empty()
            && self.time.is_empty()
            && self.timezone.is_empty()
            && self.location.is_empty();
        if is_blank {
            return None;
        }
        Some(
            [&self.title, &self.date, &self.time, &self.location]
                .iter()
                .map(|field| field.to_lowercase())
                .collect::<Vec<_>>()
                .join("|"),
        )
    }
}

impl DedupKey for QuestionItem {
    fn dedup_key(&self) -> Option<String> {
        primary_key(&self.question)
    }
}

impl DedupKey for MissingInfoItem {
    fn dedup_key(&self) -> Option<String> {
        primary_key(&self.item)
    }
}

fn primary_key(primary: &str) -> Option<String> {
    if primary.is_empty() {
        return None;
    }
    Some(primary.to_lowercase())
}

fn checklist_key(subject: &str, strength: Strength) -> Option<String> {
    if subject.is_empty() {
        return None;
    }
    Some(format!("{}|{}", subject.to_lowercase(), strength.as_str()))
}

/// Keeps the first item for every key, preserving order; keyless items go.
pub fn dedupe<T: DedupKey>(items: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| match item.dedup_key() {
            Some(key) => seen.insert(key),
            None => false,
        })
        .collect()
}

pub fn normalize(raw: &Value) -> Normalized {
    let empty = Map::new();
    let source = raw.as_object().unwrap_or(&empty);
    let schema = if CANONICAL_KEYS.iter().any(|key| source.contains_key(*key)) {
        SchemaMatch::Recognized
    } else {
        SchemaMatch::Unrecognized
    };

    let quick_facts = object_at(source, "rfp_quick_facts");
    let deadlines = object_at(quick_facts, "deadlines");
    let checklist = object_at(source, "requirements_checklist");

    let result = CanonicalResult {
        rfp_title: clean_field(source, "rfp_title"),
        issuing_organization: clean_field(source, "issuing_organization"),
        summary_paragraph: single_paragraph(&clean_field(source, "summary_paragraph")),
        rfp_quick_facts: QuickFacts {
            deadlines: Deadlines {
                questions_deadline: coerce_questions_deadline(object_at(
                    deadlines,
                    "questions_deadline",
                )),
                proposal_due: coerce_proposal_due(object_at(deadlines, "proposal_due")),
            },
            pre_bid_presentations: coerce_list(
                quick_facts.get("pre_bid_presentations"),
                coerce_pre_bid,
            ),
        },
        requirements_checklist: RequirementsChecklist {
            company: coerce_list(checklist.get("company"), coerce_requirement),
            team: coerce_list(checklist.get("team"), coerce_requirement),
            technical: coerce_list(checklist.get("technical"), coerce_requirement),
            financial: coerce_list(checklist.get("financial"), coerce_requirement),
            submission: coerce_list(checklist.get("submission"), coerce_requirement),
            deliverables_timeline: coerce_list(
                checklist.get("deliverables_timeline"),
                coerce_requirement,
            ),
            evaluation_criteria: coerce_list(
                checklist.get("evaluation_criteria"),
                coerce_requirement,
            ),
            risks_red_flags: coerce_list(checklist.get("risks_red_flags"), coerce_risk),
        },
        questions_for_client: coerce_list(source.get("questions_for_client"), coerce_question),
        missing_information: coerce_list(source.get("missing_information"), coerce_missing),
    };

    Normalized { result, schema }
}

fn coerce_list<T, F>(value: Option<&Value>, coerce: F) -> Vec<T>
where
    T: DedupKey,
    F: Fn(&Map<String, Value>) -> T,
{
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    dedupe(
        items
            .iter()
            .filter_map(Value::as_object)
            .map(coerce)
            .collect(),
    )
}

fn coerce_requirement(item: &Map<String, Value>) -> RequirementItem {
    let requirement = clean_field(item, "requirement");
    let (strength, evidence) = coerce_strength_and_evidence(item, !requirement.is_empty());
    RequirementItem {
        requirement,
        strength,
        why: clean_field(item, "why"),
        evidence,
        page_hint: clean_field(item, "page_hint"),
    }
}

fn coerce_risk(item: &Map<String, Value>) -> RiskItem {
    let risk = clean_field(item, "risk");
    let (strength, evidence) = coerce_strength_and_evidence(item, !risk.is_empty());
    RiskItem {
        risk,
        strength,
        why: clean_field(item, "why"),
        evidence,
        page_hint: clean_field(item, "page_hint"),
    }
}

fn coerce_strength_and_evidence(
    item: &Map<String, Value>,
    has_subject: bool,
) -> (Strength, String) {
    let mut strength = Strength::parse(&clean_field(item, "strength").to_lowercase());
    if strength == Strength::Unset && has_subject {
        strength = Strength::Informational;
    }
    let mut evidence = clean_field(item, "evidence");
    if !evidence_ok(&evidence) {
        evidence.clear();
    }
    (strength, evidence)
}

fn coerce_pre_bid(item: &Map<String, Value>) -> PreBidEvent {
    PreBidEvent {
        title: clean_field(item, "title"),
        date: clean_field(item, "date"),
        time: clean_field(item, "time"),
        timezone: clean_field(item, "timezone"),
        location: clean_field(item, "location"),
        mandatory: Attendance::parse(&clean_field(item, "mandatory").to_lowercase()),
    }
}

fn coerce_question(item: &Map<String, Value>) -> QuestionItem {
    QuestionItem {
        question: clean_field(item, "question"),
        why_it_matters: clean_field(item, "why_it_matters"),
    }
}

fn coerce_missing(item: &Map<String, Value>) -> MissingInfoItem {
    MissingInfoItem {
        item: clean_field(item, "item"),
        why_missing: clean_field(item, "why_missing"),
    }
}

fn coerce_questions_deadline(source: &Map<String, Value>) -> QuestionsDeadline {
    QuestionsDeadline {
        date: clean_field(source, "date"),
        time: clean_field(source, "time"),
        timezone: clean_field(source, "timezone"),
        contact_email: clean_field(source, "contact_email"),
    }
}

fn coerce_proposal_due(source: &Map<String, Value>) -> ProposalDue {
    ProposalDue {
        date: clean_field(source, "date"),
        time: clean_field(source, "time"),
        timezone: clean_field(source, "timezone"),
    }
}

fn object_at<'a>(source: &'a Map<String, Value>, key: &str) -> &'a Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    source
        .get(key)
        .and_then(Value::as_object)
        .unwrap_or_else(|| EMPTY.get_or_init(Map::new))
}

fn clean_field(source: &Map<String, Value>, key: &str) -> String {
    source.get(key).map(clean_value).unwrap_or_default()
}

/// Scalar coercion: strings are trimmed, numbers and booleans stringified,
/// placeholder tokens such as `n/a` collapse to empty.
pub fn clean_value(value: &Value) -> String {
    let text = match value {
        Value::String(s) => s.replace('\u{00A0}', " "),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return String::new(),
    };
    let trimmed = text.trim();
    if EMPTY_TOKENS.contains(&trimmed.to_lowercase().as_str()) {
        return String::new();
    }
    trimmed.to_string()
}

fn single_paragraph(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match joined.strip_prefix("- ") {
        Some(rest) => rest.trim_start().to_string(),
        None => joined,
    }
}

/// Evidence must be empty or a quote of 6 to 20 words.
pub fn evidence_ok(evidence: &str) -> bool {
    if evidence.is_empty() {
        return true;
    }
    let words = evidence.split_whitespace().count();
    (EVIDENCE_MIN_WORDS..=EVIDENCE_MAX_WORDS).contains(&words)
}
