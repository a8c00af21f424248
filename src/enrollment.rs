//! Field extraction from enrollment form text.
//!
//! Input is plain text already pulled out of an enrollment PDF. Fields are
//! found on `Label: value` lines (also `Label - value` and `Label # value`),
//! matching labels case-insensitively against a list of synonyms. Email,
//! phone and Medicare ID fall back to a scan of the whole text.

use regex_lite::Regex;
use serde::Serialize;

/// Fields recognised in an enrollment form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentFields {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub medicare_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub carrier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl EnrollmentFields {
    /// Number of fields found.
    pub fn matched(&self) -> usize {
        [
            &self.name,
            &self.first_name,
            &self.last_name,
            &self.date_of_birth,
            &self.phone,
            &self.email,
            &self.medicare_id,
            &self.carrier,
            &self.plan,
            &self.effective_date,
            &self.address,
        ]
        .iter()
        .filter(|f| f.is_some())
        .count()
    }

    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Name => &mut self.name,
            Field::FirstName => &mut self.first_name,
            Field::LastName => &mut self.last_name,
            Field::DateOfBirth => &mut self.date_of_birth,
            Field::Phone => &mut self.phone,
            Field::Email => &mut self.email,
            Field::MedicareId => &mut self.medicare_id,
            Field::Carrier => &mut self.carrier,
            Field::Plan => &mut self.plan,
            Field::EffectiveDate => &mut self.effective_date,
            Field::Address => &mut self.address,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Name,
    FirstName,
    LastName,
    DateOfBirth,
    Phone,
    Email,
    MedicareId,
    Carrier,
    Plan,
    EffectiveDate,
    Address,
}

/// Label synonyms as lowercase single-spaced words, matched exactly.
const LABELS: &[(&str, Field)] = &[
    ("applicant first name", Field::FirstName),
    ("applicant last name", Field::LastName),
    ("first name", Field::FirstName),
    ("given name", Field::FirstName),
    ("last name", Field::LastName),
    ("surname", Field::LastName),
    ("family name", Field::LastName),
    ("medicare beneficiary identifier", Field::MedicareId),
    ("medicare number", Field::MedicareId),
    ("medicare id", Field::MedicareId),
    ("mbi", Field::MedicareId),
    ("date of birth", Field::DateOfBirth),
    ("birth date", Field::DateOfBirth),
    ("dob", Field::DateOfBirth),
    ("proposed effective date", Field::EffectiveDate),
    ("effective date", Field::EffectiveDate),
    ("coverage start date", Field::EffectiveDate),
    ("plan name", Field::Plan),
    ("plan", Field::Plan),
    ("insurance company", Field::Carrier),
    ("carrier", Field::Carrier),
    ("insurer", Field::Carrier),
    ("company", Field::Carrier),
    ("permanent residence address", Field::Address),
    ("home address", Field::Address),
    ("street address", Field::Address),
    ("address", Field::Address),
    ("home phone", Field::Phone),
    ("cell phone", Field::Phone),
    ("phone number", Field::Phone),
    ("phone", Field::Phone),
    ("telephone", Field::Phone),
    ("email address", Field::Email),
    ("e-mail", Field::Email),
    ("email", Field::Email),
    ("applicant name", Field::Name),
    ("full name", Field::Name),
    ("member name", Field::Name),
    ("name", Field::Name),
];

/// Compiled patterns for enrollment text.
pub struct EnrollmentExtractor {
    line: Regex,
    email: Regex,
    phone: Regex,
    mbi: Regex,
}

impl EnrollmentExtractor {
    pub fn new() -> Result<Self, regex_lite::Error> {
        Ok(Self {
            line: Regex::new(r"^\s*([A-Za-z][A-Za-z .'/()-]{0,60}?)\s*(?::|#|\s-\s)\s*(.+?)\s*$")?,
            email: Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b")?,
            phone: Regex::new(r"\(?\b\d{3}\)?[-. ]?\d{3}[-. ]\d{4}\b")?,
            // Medicare Beneficiary Identifier, dashes optional
            mbi: Regex::new(
                r"(?i)\b[1-9][ac-hjkmnp-rt-y][ac-hjkmnp-rt-y0-9]\d-?[ac-hjkmnp-rt-y][ac-hjkmnp-rt-y0-9]\d-?[ac-hjkmnp-rt-y]{2}\d{2}\b",
            )?,
        })
    }

    /// Extract fields from `text`. The first value seen for a field wins.
    pub fn extract(&self, text: &str) -> EnrollmentFields {
        let mut fields = EnrollmentFields::default();

        for line in text.lines() {
            let Some(caps) = self.line.captures(line) else {
                continue;
            };
            let (Some(label), Some(value)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            let Some(field) = lookup_label(label.as_str()) else {
                continue;
            };
            let value = clean_value(value.as_str());
            if value.is_empty() {
                continue;
            }
            let slot = fields.slot(field);
            if slot.is_none() {
                *slot = Some(value);
            }
        }

        if fields.email.is_none() {
            fields.email = self.email.find(text).map(|m| m.as_str().to_lowercase());
        }
        if fields.phone.is_none() {
            fields.phone = self.phone.find(text).map(|m| m.as_str().to_string());
        }
        if fields.medicare_id.is_none() {
            fields.medicare_id = self.mbi.find(text).map(|m| m.as_str().to_string());
        }
        fields.medicare_id = fields
            .medicare_id
            .map(|id| id.replace('-', "").to_uppercase());

        if fields.name.is_none()
            && let (Some(first), Some(last)) = (&fields.first_name, &fields.last_name)
        {
            fields.name = Some(format!("{} {}", first, last));
        }

        fields
    }
}

fn lookup_label(raw: &str) -> Option<Field> {
    let label = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    let label = label.trim_end_matches(['.', ' ']);
    LABELS
        .iter()
        .find(|(name, _)| *name == label)
        .map(|(_, field)| *field)
}

fn clean_value(raw: &str) -> String {
    raw.trim()
        .trim_matches(|c: char| c == '_' || c == '.' || c.is_whitespace())
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
