use serde::{Deserialize, Serialize};

pub const STRENGTH_VARIANTS: [&str; 3] = ["mandatory", "preferred", "informational"];
pub const ATTENDANCE_VARIANTS: [&str; 3] = ["mandatory", "optional", "unknown"];

/// Top-level keys of the canonical extraction object.
pub const CANONICAL_KEYS: [&str; 7] = [
    "rfp_title",
    "issuing_organization",
    "summary_paragraph",
    "rfp_quick_facts",
    "requirements_checklist",
    "questions_for_client",
    "missing_information",
];

pub const REQUIREMENT_CATEGORIES: [&str; 7] = [
    "company",
    "team",
    "technical",
    "financial",
    "submission",
    "deliverables_timeline",
    "evaluation_criteria",
];

pub const RISK_CATEGORY: &str = "risks_red_flags";

#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Mandatory,
    Preferred,
    Informational,
    #[default]
    #[serde(rename = "")]
    Unset,
}

impl Strength {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mandatory => "mandatory",
            Self::Preferred => "preferred",
            Self::Informational => "informational",
            Self::Unset => "",
        }
    }

    /// Exact-match parse of an already cleaned value; anything else is unset.
    pub fn parse(value: &str) -> Self {
        match value {
            "mandatory" => Self::Mandatory,
            "preferred" => Self::Preferred,
            "informational" => Self::Informational,
            _ => Self::Unset,
        }
    }
}

/// Whether attendance at a pre-bid event is required. Never empty.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Attendance {
    Mandatory,
    Optional,
    #[default]
    Unknown,
}

impl Attendance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mandatory => "mandatory",
            Self::Optional => "optional",
            Self::Unknown => "unknown",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "mandatory" => Self::Mandatory,
            "optional" => Self::Optional,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirementItem {
    pub requirement: String,
    pub strength: Strength,
    pub why: String,
    pub evidence: String,
    pub page_hint: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RiskItem {
    pub risk: String,
    pub strength: Strength,
    pub why: String,
    pub evidence: String,
    pub page_hint: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PreBidEvent {
    pub title: String,
    pub date: String,
    pub time: String,
    pub timezone: String,
    pub location: String,
    pub mandatory: Attendance,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionItem {
    pub question: String,
    pub why_it_matters: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MissingInfoItem {
    pub item: String,
    pub why_missing: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionsDeadline {
    pub date: String,
    pub time: String,
    pub timezone: String,
    pub contact_email: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProposalDue {
    pub date: String,
    pub time: String,
    pub timezone: String,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deadlines {
    pub questions_deadline: QuestionsDeadline,
    pub proposal_due: ProposalDue,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuickFacts {
    pub deadlines: Deadlines,
    pub pre_bid_presentations: Vec<PreBidEvent>,
}

#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequirementsChecklist {
    pub company: Vec<RequirementItem>,
    pub team: Vec<RequirementItem>,
    pub technical: Vec<RequirementItem>,
    pub financial: Vec<RequirementItem>,
    pub submission: Vec<RequirementItem>,
    pub deliverables_timeline: Vec<RequirementItem>,
    pub evaluation_criteria: Vec<RequirementItem>,
    pub risks_red_flags: Vec<RiskItem>,
}

impl RequirementsChecklist {
    /// The seven requirement categories in canonical order, excluding risks.
    pub fn categories(&self) -> [(&'static str, &Vec<RequirementItem>); 7] {
        [
            ("company", &self.company),
            ("team", &self.team),
            ("technical", &self.technical),
            ("financial", &self.financial),
            ("submission", &self.submission),
            ("deliverables_timeline", &self.deliverables_timeline),
            ("evaluation_criteria", &self.evaluation_criteria),
        ]
    }

    pub fn categories_mut(&mut self) -> [(&'static str, &mut Vec<RequirementItem>); 7] {
        [
            ("company", &mut self.company),
            ("team", &mut self.team),
            ("technical", &mut self.technical),
            ("financial", &mut self.financial),
            ("submission", &mut self.submission),
            ("deliverables_timeline", &mut self.deliverables_timeline),
            ("evaluation_criteria", &mut self.evaluation_criteria),
        ]
    }

    pub fn is_empty(&self) -> bool {
        self.categories().iter().all(|(_, items)| items.is_empty())
            && self.risks_red_flags.is_empty()
    }
}

/// Document-level extraction result. Every key is always serialized.
#[derive(Debug, Default, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalResult {
    pub rfp_title: String,
    pub issuing_organization: String,
    pub summary_paragraph: String,
    pub rfp_quick_facts: QuickFacts,
    pub requirements_checklist: RequirementsChecklist,
    pub questions_for_client: Vec<QuestionItem>,
    pub missing_information: Vec<MissingInfoItem>,
}

impl CanonicalResult {
    /// True when no scalar or list field carries content.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn empty_result_serializes_every_key() {
        let value = serde_json::to_value(CanonicalResult::default()).unwrap();
        for key in CANONICAL_KEYS {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        let checklist = &value["requirements_checklist"];
        for key in REQUIREMENT_CATEGORIES {
            assert_eq!(checklist[key], Value::Array(vec![]));
        }
        assert_eq!(checklist[RISK_CATEGORY], Value::Array(vec![]));
        assert_eq!(
            value["rfp_quick_facts"]["deadlines"]["questions_deadline"]["contact_email"],
            ""
        );
    }

    #[test]
    fn enums_serialize_as_plain_strings() {
        let item = RiskItem {
            risk: "Late bids rejected".into(),
            strength: Strength::Mandatory,
            ..RiskItem::default()
        };
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["strength"], "mandatory");
        assert_eq!(serde_json::to_value(Strength::Unset).unwrap(), "");
        assert_eq!(serde_json::to_value(Attendance::default()).unwrap(), "unknown");
        for variant in STRENGTH_VARIANTS {
            assert_eq!(Strength::parse(variant).as_str(), variant);
        }
        for variant in ATTENDANCE_VARIANTS {
            assert_eq!(Attendance::parse(variant).as_str(), variant);
        }
    }
}
