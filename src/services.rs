use crate::clock::Clock;
use crate::config::Config;
use crate::eligibility::{EligibilityDecision, EligibilityPolicy, IneligibilityReason};
use crate::errors::{AppError, ResultExt};
use crate::lifecycle::{self, Resolution, ResolutionPolicy};
use crate::models::{
    Client, ClientAggregate, ClientId, ClientRegistration, ClientUpdate, CreditRequest,
    CreditRequestId, Document, NewClient,
};
use crate::repository::{ClientRepository, CreditRequestRepository};
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of per-client async locks.
///
/// Every read-modify-write on a client aggregate (evaluate-then-create,
/// onboarding, contact updates) runs while holding the client's lock, so two
/// concurrent operations on the same client never interleave. Entries unused
/// for the idle period are dropped; the idle period must exceed the longest
/// critical section.
#[derive(Clone)]
pub struct ClientLocks {
    locks: Cache<ClientId, Arc<Mutex<()>>>,
}

impl ClientLocks {
    pub fn new(idle: Duration) -> Self {
        Self {
            locks: Cache::builder().time_to_idle(idle).build(),
        }
    }

    /// Waits for and takes the lock of `client_id`.
    pub async fn acquire(&self, client_id: ClientId) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .get_with(client_id, async { Arc::new(Mutex::new(())) })
            .await;
        lock.lock_owned().await
    }
}

impl Default for ClientLocks {
    fn default() -> Self {
        Self::new(Config::default().client_lock_idle())
    }
}

/// Shared service state handed to an inbound layer.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Config,
    /// Client registration and maintenance.
    pub clients: Arc<ClientService>,
    /// Credit eligibility and request lifecycle.
    pub credit: Arc<CreditService>,
}

impl AppState {
    /// Wires both services over one store, sharing a single lock registry.
    pub fn new<S>(store: Arc<S>, clock: Arc<dyn Clock>, config: Config) -> Self
    where
        S: ClientRepository + CreditRequestRepository + 'static,
    {
        let locks = ClientLocks::new(config.client_lock_idle());
        let client_repo: Arc<dyn ClientRepository> = store.clone();
        let request_repo: Arc<dyn CreditRequestRepository> = store;

        let clients = ClientService::new(client_repo.clone(), clock.clone(), locks.clone())
            .with_eligibility_policy(config.eligibility_policy());
        let credit = CreditService::new(client_repo, request_repo, clock, locks)
            .with_policies(config.eligibility_policy(), config.resolution_policy());

        Self {
            config,
            clients: Arc::new(clients),
            credit: Arc::new(credit),
        }
    }
}

// ============ Clients ============

pub struct ClientService {
    clients: Arc<dyn ClientRepository>,
    clock: Arc<dyn Clock>,
    locks: ClientLocks,
    eligibility: EligibilityPolicy,
}

impl ClientService {
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        clock: Arc<dyn Clock>,
        locks: ClientLocks,
    ) -> Self {
        Self {
            clients,
            clock,
            locks,
            eligibility: EligibilityPolicy::default(),
        }
    }

    /// Sets the cooldown that guards client deletion.
    pub fn with_eligibility_policy(mut self, eligibility: EligibilityPolicy) -> Self {
        self.eligibility = eligibility;
        self
    }

    /// Registers a new client with onboarding still pending.
    pub async fn register(&self, registration: ClientRegistration) -> Result<Client, AppError> {
        let name = required_name(&registration.name)?;
        let document = Document::parse(&registration.document)?;

        let client = self
            .clients
            .create(NewClient {
                name,
                document,
                email: optional_text(registration.email),
                phone: optional_text(registration.phone),
                registered_at: self.clock.now(),
            })
            .await
            .context("Failed to register client")?;

        tracing::info!(
            "✓ Registered client {} ({:?}, {})",
            client.id,
            client.document.kind(),
            client.document.masked()
        );
        Ok(client)
    }

    pub async fn get(&self, id: ClientId) -> Result<ClientAggregate, AppError> {
        self.clients
            .find_by_id(id)
            .await?
            .ok_or(AppError::InvalidClientReference(id))
    }

    pub async fn get_by_document(&self, raw_document: &str) -> Result<ClientAggregate, AppError> {
        let document = Document::parse(raw_document)?;
        self.clients
            .find_by_document(&document)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("No client with document {}", document.masked()))
            })
    }

    pub async fn list(&self) -> Result<Vec<Client>, AppError> {
        self.clients.list_all().await
    }

    /// Replaces name, email and phone. Document and registration date are immutable.
    pub async fn update_contact(
        &self,
        id: ClientId,
        update: ClientUpdate,
    ) -> Result<Client, AppError> {
        let name = required_name(&update.name)?;

        let _guard = self.locks.acquire(id).await;
        let mut client = self.get(id).await?.client;
        client.name = name;
        client.email = optional_text(update.email);
        client.phone = optional_text(update.phone);

        self.clients
            .update(&client)
            .await
            .with_context(|| format!("Failed to update client {}", id))?;

        tracing::info!("Updated contact data of client {}", id);
        Ok(client)
    }

    /// Marks onboarding as finished. Happens once; a repeated call is a conflict.
    pub async fn complete_onboarding(&self, id: ClientId) -> Result<Client, AppError> {
        let _guard = self.locks.acquire(id).await;
        let mut client = self.get(id).await?.client;

        if client.onboarding_complete {
            return Err(AppError::Conflict(format!(
                "Client {} has already completed onboarding",
                id
            )));
        }

        client.onboarding_complete = true;
        self.clients
            .update(&client)
            .await
            .with_context(|| format!("Failed to complete onboarding of client {}", id))?;

        tracing::info!("✓ Client {} completed onboarding", id);
        Ok(client)
    }

    /// Deletes a client whose requests are all resolved and outside the cooldown window.
    ///
    /// Requests stay in the store keyed by the old id, so a client re-registered
    /// with the same document starts with an empty history. Refusing deletion
    /// inside the window keeps that from resetting the cooldown.
    pub async fn delete(&self, id: ClientId) -> Result<(), AppError> {
        let _guard = self.locks.acquire(id).await;
        let aggregate = self.get(id).await?;

        let now = self.clock.now();
        if let Some(IneligibilityReason::CooldownActive { available_at, .. }) =
            self.eligibility.cooldown_block(&aggregate.credit_requests, now)
        {
            return Err(AppError::Conflict(format!(
                "Client {} has a credit request inside the cooldown window until {}",
                id, available_at
            )));
        }

        self.clients.delete(id).await?;
        tracing::info!("Deleted client {}", id);
        Ok(())
    }
}

// ============ Credit ============

/// Result of a credit request attempt. Ineligibility is an answer, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditOutcome {
    Opened(CreditRequest),
    Ineligible(IneligibilityReason),
}

pub struct CreditService {
    clients: Arc<dyn ClientRepository>,
    requests: Arc<dyn CreditRequestRepository>,
    clock: Arc<dyn Clock>,
    locks: ClientLocks,
    eligibility: EligibilityPolicy,
    resolution: ResolutionPolicy,
}

impl CreditService {
    /// Creates the service with the default policies.
    pub fn new(
        clients: Arc<dyn ClientRepository>,
        requests: Arc<dyn CreditRequestRepository>,
        clock: Arc<dyn Clock>,
        locks: ClientLocks,
    ) -> Self {
        Self {
            clients,
            requests,
            clock,
            locks,
            eligibility: EligibilityPolicy::default(),
            resolution: ResolutionPolicy::default(),
        }
    }

    pub fn with_policies(
        mut self,
        eligibility: EligibilityPolicy,
        resolution: ResolutionPolicy,
    ) -> Self {
        self.eligibility = eligibility;
        self.resolution = resolution;
        self
    }

    async fn load_aggregate(&self, client_id: ClientId) -> Result<ClientAggregate, AppError> {
        self.clients
            .find_by_id(client_id)
            .await?
            .ok_or(AppError::InvalidClientReference(client_id))
    }

    /// Evaluates eligibility at the current time without opening anything.
    pub async fn check_eligibility(
        &self,
        client_id: ClientId,
    ) -> Result<EligibilityDecision, AppError> {
        let aggregate = self.load_aggregate(client_id).await?;
        Ok(self.eligibility.evaluate(&aggregate, self.clock.now()))
    }

    /// Evaluates eligibility and, if it passes, opens a new credit request.
    ///
    /// Both steps run under the client's lock, so concurrent attempts for the
    /// same client cannot both pass the cooldown check.
    pub async fn request_credit(&self, client_id: ClientId) -> Result<CreditOutcome, AppError> {
        let _guard = self.locks.acquire(client_id).await;

        let aggregate = self.load_aggregate(client_id).await?;
        let now = self.clock.now();

        if let EligibilityDecision::Ineligible(reason) =
            self.eligibility.evaluate(&aggregate, now)
        {
            tracing::info!("Client {} is not eligible for credit: {:?}", client_id, reason);
            return Ok(CreditOutcome::Ineligible(reason));
        }

        let request = self
            .requests
            .create_credit_request(lifecycle::open(client_id, now))
            .await
            .with_context(|| format!("Failed to open credit request for client {}", client_id))?;

        tracing::info!(
            "✓ Opened credit request {} for client {}",
            request.id,
            client_id
        );
        Ok(CreditOutcome::Opened(request))
    }

    /// Applies a scoring decision to a pending request.
    ///
    /// Fails with `InvalidStateTransition` if the request is already resolved,
    /// including when a concurrent resolution wins the race.
    pub async fn resolve_credit(
        &self,
        request_id: CreditRequestId,
        resolution: impl Into<Resolution>,
    ) -> Result<CreditRequest, AppError> {
        let resolution = resolution.into();
        let current = self.get_credit_request(request_id).await?;

        let resolved = lifecycle::resolve(&current, &resolution, &self.resolution, self.clock.now())
            .map_err(|e| {
                tracing::warn!("❌ Rejected resolution of credit request {}: {}", request_id, e);
                AppError::from(e)
            })?;

        let written = self
            .requests
            .update_credit_request(&resolved, current.status)
            .await
            .with_context(|| {
                format!("Failed to store resolution of credit request {}", request_id)
            })?;

        if !written {
            let latest = self.get_credit_request(request_id).await?;
            tracing::warn!(
                "❌ Credit request {} was resolved concurrently (now {})",
                request_id,
                latest.status
            );
            return Err(AppError::InvalidStateTransition {
                request_id,
                from: latest.status,
                to: resolved.status,
            });
        }

        tracing::info!(
            "✓ Credit request {} resolved as {} (score: {:?})",
            request_id,
            resolved.status,
            resolved.score
        );
        Ok(resolved)
    }

    pub async fn get_credit_request(
        &self,
        request_id: CreditRequestId,
    ) -> Result<CreditRequest, AppError> {
        self.requests
            .find_credit_request(request_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Credit request {} not found", request_id)))
    }

    /// Returns the client's requests, oldest first.
    pub async fn list_credit_requests(
        &self,
        client_id: ClientId,
    ) -> Result<Vec<CreditRequest>, AppError> {
        let mut requests = self.load_aggregate(client_id).await?.credit_requests;
        requests.sort_by_key(|r| (r.requested_at, r.id));
        Ok(requests)
    }
}

fn required_name(raw: &str) -> Result<String, AppError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    Ok(name.to_string())
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
