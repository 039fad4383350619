use crate::pipeline::chunker::Chunk;

pub const SYSTEM_PROMPT: &str = concat!(
    "You are an RFP extraction engine. Output ONLY one JSON object (double quotes). ",
    "No markdown, no code fences. ",
    "Return EXACT schema: {rfp_title, issuing_organization, summary_paragraph, ",
    "rfp_quick_facts:{deadlines:{questions_deadline:{date,time,timezone,contact_email}, ",
    "proposal_due:{date,time,timezone}}, ",
    "pre_bid_presentations:[{title,date,time,timezone,location,mandatory}]}, ",
    "requirements_checklist:{company:[],team:[],technical:[],financial:[],submission:[],",
    "deliverables_timeline:[],evaluation_criteria:[],risks_red_flags:[]}, ",
    "questions_for_client:[{question,why_it_matters}], missing_information:[{item,why_missing}]}. ",
    "All fields are strings. Unknown => \"\" or []. ",
    "pre_bid_presentations[].mandatory must be mandatory|optional|unknown ",
    "(use unknown if unclear; never empty). ",
    "Checklist items MUST be {requirement,strength,why,evidence,page_hint}. ",
    "risks_red_flags items MUST be {risk,strength,why,evidence,page_hint}. ",
    "strength must be mandatory|preferred|informational; ",
    "if requirement/risk exists, strength cannot be empty. ",
    "evidence must be an exact quote of 6-20 words from the provided text, otherwise \"\". ",
    "Never output {} for deadlines or any object. Never invent facts. ",
    "Lines between 'Context:' and '----' are metadata about the upload: ",
    "never extract facts from them."
);

const CATEGORY_GUIDE: &str = "\
- company: eligibility, registrations, org experience, compliance gates
- team: key experts, CVs, required experience/certs
- technical: scope/tasks/methodology
- financial: pricing/payment/fees/taxes
- submission: format, channel, deadline, language, required docs
- deliverables_timeline: deliverables and due timing
- evaluation_criteria: scoring weights/criteria
- risks_red_flags: disqualification, penalties, legal/compliance red flags";

pub fn user_prompt(chunk: &Chunk) -> String {
    format!(
        "This is part {index} of {total} of the document.\n\
         Extract ONLY from the text below. Fill the schema. Categorize requirements:\n\
         {CATEGORY_GUIDE}\n\
         If a field is not explicitly present, leave it \"\" or [].\n\
         TEXT:\n<<<{body}>>>",
        index = chunk.index,
        total = chunk.total,
        body = chunk.body(),
    )
}

/// Metadata header prefixed to every chunk of an uploaded file.
pub fn context_header(file_name: &str, mode: &str) -> String {
    format!("Context:\n- File: {file_name}\n- Mode: {mode}")
}
