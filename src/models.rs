use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Matching Models ============

/// Raw identifying fields of a lead that is about to be saved or imported.
///
/// `legal_name` is required; callers reject blank names before a check runs.
/// Every other field is free-form user input and may be missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateCheckInput {
    /// Legal name (razão social).
    pub legal_name: String,
    /// Trade name (nome fantasia).
    #[serde(default)]
    pub trade_name: Option<String>,
    /// CNPJ in any format.
    #[serde(default)]
    pub cnpj: Option<String>,
    /// Contact email of the lead.
    #[serde(default)]
    pub email: Option<String>,
    /// Company website.
    #[serde(default)]
    pub website: Option<String>,
}

impl DuplicateCheckInput {
    pub fn new(legal_name: impl Into<String>) -> Self {
        Self {
            legal_name: legal_name.into(),
            trade_name: None,
            cnpj: None,
            email: None,
            website: None,
        }
    }

    pub fn with_trade_name(mut self, trade_name: impl Into<String>) -> Self {
        self.trade_name = Some(trade_name.into());
        self
    }

    pub fn with_cnpj(mut self, cnpj: impl Into<String>) -> Self {
        self.cnpj = Some(cnpj.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }

    /// Whether the only mandatory field carries something other than whitespace.
    pub fn has_legal_name(&self) -> bool {
        !self.legal_name.trim().is_empty()
    }
}

impl From<&ExistingLead> for DuplicateCheckInput {
    fn from(lead: &ExistingLead) -> Self {
        Self {
            legal_name: lead.legal_name.clone(),
            trade_name: lead.trade_name.clone(),
            cnpj: lead.cnpj.clone(),
            email: lead.email.clone(),
            website: lead.website.clone(),
        }
    }
}

/// A stored lead used as comparison material. Never mutated by the matcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistingLead {
    /// Opaque identifier assigned by the lead store.
    pub id: String,
    /// Legal name (razão social).
    pub legal_name: String,
    /// Trade name (nome fantasia).
    #[serde(default)]
    pub trade_name: Option<String>,
    /// CNPJ as stored.
    #[serde(default)]
    pub cnpj: Option<String>,
    /// Email of the primary contact.
    #[serde(default, alias = "primary_contact_email")]
    pub email: Option<String>,
    /// Company website.
    #[serde(default)]
    pub website: Option<String>,
}

impl ExistingLead {
    pub fn new(id: impl Into<String>, legal_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            legal_name: legal_name.into(),
            trade_name: None,
            cnpj: None,
            email: None,
            website: None,
        }
    }

    pub fn with_trade_name(mut self, trade_name: impl Into<String>) -> Self {
        self.trade_name = Some(trade_name.into());
        self
    }

    pub fn with_cnpj(mut self, cnpj: impl Into<String>) -> Self {
        self.cnpj = Some(cnpj.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn with_website(mut self, website: impl Into<String>) -> Self {
        self.website = Some(website.into());
        self
    }
}

/// Fields that take part in duplicate scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeadField {
    LegalName,
    Cnpj,
    TradeName,
    EmailDomain,
    WebsiteDomain,
}

impl LeadField {
    pub const ALL: [LeadField; 5] = [
        LeadField::LegalName,
        LeadField::Cnpj,
        LeadField::TradeName,
        LeadField::EmailDomain,
        LeadField::WebsiteDomain,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeadField::LegalName => "legal_name",
            LeadField::Cnpj => "cnpj",
            LeadField::TradeName => "trade_name",
            LeadField::EmailDomain => "email_domain",
            LeadField::WebsiteDomain => "website_domain",
        }
    }

    /// Label shown next to the field in warnings and merge dialogs.
    pub fn label(&self) -> &'static str {
        match self {
            LeadField::LegalName => "Razão Social",
            LeadField::Cnpj => "CNPJ",
            LeadField::TradeName => "Nome Fantasia",
            LeadField::EmailDomain => "Domínio de Email",
            LeadField::WebsiteDomain => "Domínio do Website",
        }
    }
}

/// Score of a single field for one candidate/existing pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldScore {
    field: LeadField,
    label: &'static str,
    similarity: f64,
    weight: f64,
    contribution: f64,
    input_value: String,
    matched_value: String,
}

impl FieldScore {
    /// Builds a field score; the contribution is always `similarity * weight`.
    pub fn new(
        field: LeadField,
        similarity: f64,
        weight: f64,
        input_value: impl Into<String>,
        matched_value: impl Into<String>,
    ) -> Self {
        let similarity = similarity.clamp(0.0, 1.0);
        Self {
            field,
            label: field.label(),
            similarity,
            weight,
            contribution: similarity * weight,
            input_value: input_value.into(),
            matched_value: matched_value.into(),
        }
    }

    pub fn field(&self) -> LeadField {
        self.field
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Raw similarity in `0..=1`.
    pub fn similarity(&self) -> f64 {
        self.similarity
    }

    /// Renormalized weight applied to this field.
    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub fn contribution(&self) -> f64 {
        self.contribution
    }

    /// Normalized value of the lead being checked.
    pub fn input_value(&self) -> &str {
        &self.input_value
    }

    /// Normalized value of the existing lead.
    pub fn matched_value(&self) -> &str {
        &self.matched_value
    }
}

/// Coarse confidence bucket of a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchSeverity {
    High,
    Medium,
    Low,
}

/// An existing lead that likely represents the same company as the checked one.
///
/// The score is derived from the field breakdown on construction and cannot be
/// set on its own.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DuplicateCandidate {
    lead_id: String,
    legal_name: String,
    score: f64,
    severity: MatchSeverity,
    field_scores: Vec<FieldScore>,
}

impl DuplicateCandidate {
    pub(crate) fn new(
        lead_id: String,
        legal_name: String,
        field_scores: Vec<FieldScore>,
        severity_of: impl Fn(f64) -> MatchSeverity,
    ) -> Self {
        let score = total_score(&field_scores);
        Self {
            lead_id,
            legal_name,
            score,
            severity: severity_of(score),
            field_scores,
        }
    }

    pub fn lead_id(&self) -> &str {
        &self.lead_id
    }

    pub fn legal_name(&self) -> &str {
        &self.legal_name
    }

    /// Weighted score in `0..=100`.
    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn severity(&self) -> MatchSeverity {
        self.severity
    }

    pub fn field_scores(&self) -> &[FieldScore] {
        &self.field_scores
    }

    pub fn field_score(&self, field: LeadField) -> Option<&FieldScore> {
        self.field_scores.iter().find(|s| s.field == field)
    }
}

/// Scores are rounded to this many decimal places.
pub const SCORE_DECIMALS: i32 = 6;

/// Sum of the field contributions, rounded to [`SCORE_DECIMALS`] places and
/// kept inside `0..=100`.
///
/// Renormalized weights are rarely exact in binary, so an unrounded sum can
/// land a hair below a threshold it actually meets (`39.99999999999999`).
pub fn total_score(field_scores: &[FieldScore]) -> f64 {
    let scale = 10f64.powi(SCORE_DECIMALS);
    let sum: f64 = field_scores.iter().map(FieldScore::contribution).sum();
    ((sum * scale).round() / scale).clamp(0.0, 100.0)
}

// ============ Database Models ============

/// Row of `public.leads` joined with the email of its primary contact.
#[derive(Debug, Clone, FromRow)]
pub struct LeadRow {
    pub id: Uuid,
    pub legal_name: String,
    pub trade_name: Option<String>,
    pub cnpj: Option<String>,
    pub website: Option<String>,
    pub primary_contact_email: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<LeadRow> for ExistingLead {
    fn from(row: LeadRow) -> Self {
        Self {
            id: row.id.to_string(),
            legal_name: row.legal_name,
            trade_name: row.trade_name,
            cnpj: row.cnpj,
            email: row.primary_contact_email,
            website: row.website,
        }
    }
}

// ============ API Request/Response Models ============

/// Knobs of a check-before-save request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionOptions {
    /// Minimum score to report; never below the detection threshold.
    #[serde(default)]
    pub min_score: Option<f64>,
    /// Maximum number of candidates to return.
    #[serde(default)]
    pub max_results: Option<usize>,
    /// Lead being edited, excluded from its own check.
    #[serde(default)]
    pub exclude_lead_id: Option<String>,
    /// Also compare against leads already qualified.
    #[serde(default)]
    pub include_qualified: bool,
    /// Serve the stored set from cache instead of reloading it. Checks
    /// reload by default so a lead saved a moment ago is seen.
    #[serde(default)]
    pub cached: bool,
}

/// Request payload for `POST /api/v1/leads/duplicates/check`.
#[derive(Debug, Deserialize)]
pub struct DuplicateCheckRequest {
    pub lead: DuplicateCheckInput,
    #[serde(default)]
    pub options: DetectionOptions,
}

/// Request payload for `POST /api/v1/leads/duplicates/compare`.
#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    pub lead: DuplicateCheckInput,
    pub existing: Vec<ExistingLead>,
    #[serde(default)]
    pub options: DetectionOptions,
}

/// Result of a duplicate check.
#[derive(Debug, Clone, Serialize)]
pub struct DuplicateCheckResponse {
    pub duplicates: Vec<DuplicateCandidate>,
    pub has_duplicates: bool,
    pub high_severity_count: usize,
    /// Number of existing leads the candidate was compared against.
    pub compared: usize,
}

impl DuplicateCheckResponse {
    pub fn new(duplicates: Vec<DuplicateCandidate>, compared: usize) -> Self {
        let high_severity_count = duplicates
            .iter()
            .filter(|d| d.severity() == MatchSeverity::High)
            .count();
        Self {
            has_duplicates: !duplicates.is_empty(),
            high_severity_count,
            compared,
            duplicates,
        }
    }
}

/// One spreadsheet row mapped by the import wizard.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImportRowInput {
    /// 1-based row number in the source file.
    pub row_number: usize,
    #[serde(default)]
    pub legal_name: Option<String>,
    #[serde(default)]
    pub trade_name: Option<String>,
    #[serde(default)]
    pub cnpj: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
}

impl ImportRowInput {
    /// Check input for this row, or `None` when the legal name is blank.
    pub fn to_check_input(&self) -> Option<DuplicateCheckInput> {
        let legal_name = self
            .legal_name
            .as_deref()
            .filter(|name| !name.trim().is_empty())?;
        Some(DuplicateCheckInput {
            legal_name: legal_name.to_string(),
            trade_name: self.trade_name.clone(),
            cnpj: self.cnpj.clone(),
            email: self.email.clone(),
            website: self.website.clone(),
        })
    }
}

/// Request payload for `POST /api/v1/leads/import/duplicates`.
#[derive(Debug, Deserialize)]
pub struct ImportCheckRequest {
    pub rows: Vec<ImportRowInput>,
    /// Existing set already loaded by the caller; storage is used when absent.
    #[serde(default)]
    pub existing: Option<Vec<ExistingLead>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ImportRowStatus {
    Clean,
    Duplicate,
    Invalid,
}

/// Conflict check outcome of one import row.
#[derive(Debug, Clone, Serialize)]
pub struct ImportRowResult {
    pub row_number: usize,
    pub status: ImportRowStatus,
    pub duplicates: Vec<DuplicateCandidate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Summary returned to the import wizard.
#[derive(Debug, Clone, Serialize)]
pub struct ImportDuplicateReport {
    pub total: usize,
    pub duplicates: usize,
    pub invalid: usize,
    pub clean: usize,
    pub rows: Vec<ImportRowResult>,
}

impl ImportDuplicateReport {
    pub fn from_rows(rows: Vec<ImportRowResult>) -> Self {
        let count = |status: ImportRowStatus| rows.iter().filter(|r| r.status == status).count();
        Self {
            total: rows.len(),
            duplicates: count(ImportRowStatus::Duplicate),
            invalid: count(ImportRowStatus::Invalid),
            clean: count(ImportRowStatus::Clean),
            rows,
        }
    }
}
