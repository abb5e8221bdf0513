use crate::eligibility::{EligibilityDecision, IneligibilityReason};
use crate::errors::AppError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Store-assigned client identifier.
pub type ClientId = i64;
/// Store-assigned credit request identifier.
pub type CreditRequestId = i64;

// ============ Documents ============

/// Whether a registration document belongs to a person or a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKind {
    /// CPF, 11 characters.
    Individual,
    /// CNPJ, 14 characters.
    Organization,
}

/// Tax/registration document (CPF or CNPJ), stored without punctuation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Document(String);

impl Document {
    pub const INDIVIDUAL_LEN: usize = 11;
    pub const ORGANIZATION_LEN: usize = 14;

    /// Parses a raw document, dropping `.`, `-`, `/` and whitespace.
    ///
    /// The cleaned value must be exactly 11 (CPF) or 14 (CNPJ) characters long.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let cleaned: String = raw
            .chars()
            .filter(|c| !matches!(c, '.' | '-' | '/') && !c.is_whitespace())
            .collect();

        if cleaned.is_empty() {
            return Err(AppError::Validation("Document (CPF/CNPJ) is required".to_string()));
        }

        match cleaned.chars().count() {
            Self::INDIVIDUAL_LEN | Self::ORGANIZATION_LEN => Ok(Self(cleaned)),
            n => Err(AppError::Validation(format!(
                "Document must have 11 (CPF) or 14 (CNPJ) characters, got {}",
                n
            ))),
        }
    }

    pub fn kind(&self) -> DocumentKind {
        if self.0.chars().count() == Self::INDIVIDUAL_LEN {
            DocumentKind::Individual
        } else {
            DocumentKind::Organization
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Log-safe rendering.
    pub fn masked(&self) -> String {
        crate::obs::mask(&self.0)
    }
}

impl TryFrom<String> for Document {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Document::parse(&value)
    }
}

impl From<Document> for String {
    fn from(document: Document) -> Self {
        document.0
    }
}

impl fmt::Display for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============ Clients ============

/// A registered bank customer, individual or organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    pub document: Document,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Set at creation, never changed.
    pub registered_at: DateTime<Utc>,
    /// Flips false -> true once, when onboarding finishes.
    pub onboarding_complete: bool,
}

/// Client data handed to the store; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewClient {
    pub name: String,
    pub document: Document,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl NewClient {
    pub fn into_client(self, id: ClientId) -> Client {
        Client {
            id,
            name: self.name,
            document: self.document,
            email: self.email,
            phone: self.phone,
            registered_at: self.registered_at,
            onboarding_complete: false,
        }
    }
}

/// Replacement values for a client's mutable contact fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ClientUpdate {
    #[serde(rename = "nome")]
    pub name: String,
    pub email: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
}

/// A client together with every credit request it owns.
///
/// Eligibility is only correct when `credit_requests` is the complete,
/// current set for the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAggregate {
    pub client: Client,
    pub credit_requests: Vec<CreditRequest>,
}

impl ClientAggregate {
    pub fn new(client: Client, credit_requests: Vec<CreditRequest>) -> Self {
        Self {
            client,
            credit_requests,
        }
    }

    pub fn has_open_request(&self) -> bool {
        self.credit_requests
            .iter()
            .any(|r| r.status == CreditStatus::InProgress)
    }
}

// ============ Credit Requests ============

/// Status of a credit request, serialized by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CreditStatus {
    #[serde(rename = "EmAndamento", alias = "InProgress")]
    InProgress,
    #[serde(rename = "Aprovado", alias = "Approved")]
    Approved,
    #[serde(rename = "Negado", alias = "Denied")]
    Denied,
}

impl CreditStatus {
    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            CreditStatus::InProgress => "EmAndamento",
            CreditStatus::Approved => "Aprovado",
            CreditStatus::Denied => "Negado",
        }
    }
}

impl fmt::Display for CreditStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CreditStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EmAndamento" | "InProgress" => Ok(CreditStatus::InProgress),
            "Aprovado" | "Approved" => Ok(CreditStatus::Approved),
            "Negado" | "Denied" => Ok(CreditStatus::Denied),
            other => Err(AppError::Validation(format!(
                "Unknown credit request status: {}",
                other
            ))),
        }
    }
}

/// Outcome a scoring process may assign to a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    #[serde(rename = "Aprovado", alias = "Approved")]
    Approved,
    #[serde(rename = "Negado", alias = "Denied")]
    Denied,
}

impl From<Decision> for CreditStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Approved => CreditStatus::Approved,
            Decision::Denied => CreditStatus::Denied,
        }
    }
}

/// A single application for credit, tracked from submission to resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequest {
    pub id: CreditRequestId,
    pub client_id: ClientId,
    pub requested_at: DateTime<Utc>,
    pub status: CreditStatus,
    pub score: Option<i32>,
    pub justification: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
}

/// A freshly opened request, before the store assigns its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCreditRequest {
    pub client_id: ClientId,
    pub requested_at: DateTime<Utc>,
}

impl NewCreditRequest {
    pub fn into_request(self, id: CreditRequestId) -> CreditRequest {
        CreditRequest {
            id,
            client_id: self.client_id,
            requested_at: self.requested_at,
            status: CreditStatus::InProgress,
            score: None,
            justification: None,
            responded_at: None,
        }
    }
}

// ============ Wire Models ============

/// Inbound client registration payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientRegistration {
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "documento")]
    pub document: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "telefone")]
    pub phone: Option<String>,
}

/// Result posted back by the external scoring process.
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringResult {
    #[serde(rename = "decisao")]
    pub decision: Decision,
    #[serde(default)]
    pub score: Option<i32>,
    #[serde(default, rename = "justificativa")]
    pub justification: Option<String>,
}

/// Client-facing client representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientResponse {
    pub id: ClientId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "documento")]
    pub document: String,
    pub email: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "cadastroCompleto")]
    pub onboarding_complete: bool,
}

impl From<&Client> for ClientResponse {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
            document: client.document.to_string(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            onboarding_complete: client.onboarding_complete,
        }
    }
}

/// Internal transfer shape of a client, including the registration timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientDto {
    pub id: ClientId,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "documento")]
    pub document: Document,
    pub email: Option<String>,
    #[serde(rename = "telefone")]
    pub phone: Option<String>,
    #[serde(rename = "dataCadastro")]
    pub registered_at: DateTime<Utc>,
    #[serde(rename = "cadastroCompleto")]
    pub onboarding_complete: bool,
}

impl From<&Client> for ClientDto {
    fn from(client: &Client) -> Self {
        Self {
            id: client.id,
            name: client.name.clone(),
            document: client.document.clone(),
            email: client.email.clone(),
            phone: client.phone.clone(),
            registered_at: client.registered_at,
            onboarding_complete: client.onboarding_complete,
        }
    }
}

impl From<ClientDto> for Client {
    fn from(dto: ClientDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            document: dto.document,
            email: dto.email,
            phone: dto.phone,
            registered_at: dto.registered_at,
            onboarding_complete: dto.onboarding_complete,
        }
    }
}

/// Client-facing credit request representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreditRequestResponse {
    pub id: CreditRequestId,
    pub status: CreditStatus,
    pub score: Option<i32>,
    #[serde(rename = "justificativa")]
    pub justification: Option<String>,
    #[serde(rename = "dataSolicitacao")]
    pub requested_at: DateTime<Utc>,
    #[serde(rename = "dataResposta")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl From<&CreditRequest> for CreditRequestResponse {
    fn from(request: &CreditRequest) -> Self {
        Self {
            id: request.id,
            status: request.status,
            score: request.score,
            justification: request.justification.clone(),
            requested_at: request.requested_at,
            responded_at: request.responded_at,
        }
    }
}

/// Internal transfer shape of a credit request, including the owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditRequestDto {
    pub id: CreditRequestId,
    #[serde(rename = "clienteId")]
    pub client_id: ClientId,
    #[serde(rename = "dataSolicitacao")]
    pub requested_at: DateTime<Utc>,
    pub status: CreditStatus,
    pub score: Option<i32>,
    #[serde(rename = "justificativa")]
    pub justification: Option<String>,
    #[serde(rename = "dataResposta")]
    pub responded_at: Option<DateTime<Utc>>,
}

impl From<&CreditRequest> for CreditRequestDto {
    fn from(request: &CreditRequest) -> Self {
        Self {
            id: request.id,
            client_id: request.client_id,
            requested_at: request.requested_at,
            status: request.status,
            score: request.score,
            justification: request.justification.clone(),
            responded_at: request.responded_at,
        }
    }
}

/// Client-facing answer to "may this client request credit now?".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EligibilityResponse {
    #[serde(rename = "elegivel")]
    pub eligible: bool,
    #[serde(rename = "motivo")]
    pub reason: Option<String>,
    #[serde(rename = "disponivelEm")]
    pub available_at: Option<DateTime<Utc>>,
}

impl From<&EligibilityDecision> for EligibilityResponse {
    fn from(decision: &EligibilityDecision) -> Self {
        match decision {
            EligibilityDecision::Eligible => Self {
                eligible: true,
                reason: None,
                available_at: None,
            },
            EligibilityDecision::Ineligible(IneligibilityReason::OnboardingIncomplete) => Self {
                eligible: false,
                reason: Some("onboarding_incomplete".to_string()),
                available_at: None,
            },
            EligibilityDecision::Ineligible(IneligibilityReason::CooldownActive {
                available_at,
                ..
            }) => Self {
                eligible: false,
                reason: Some("cooldown_active".to_string()),
                available_at: Some(*available_at),
            },
        }
    }
}
