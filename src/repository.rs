use crate::errors::AppError;
use crate::models::{
    Client, ClientAggregate, ClientId, CreditRequest, CreditRequestId, CreditStatus, Document,
    NewClient, NewCreditRequest,
};
use async_trait::async_trait;

/// Client persistence consumed by the services.
///
/// Implementations own the store-level invariants:
/// - documents are unique across clients (`AppError::Conflict`)
/// - a client with an `EmAndamento` request cannot be deleted (`AppError::Conflict`)
///
/// `delete` removes only the client; its credit requests stay as audit trail
/// under the old id and are not re-attached if the document registers again.
#[async_trait]
pub trait ClientRepository: Send + Sync {
    /// Loads a client with its complete credit request history.
    async fn find_by_id(&self, id: ClientId) -> Result<Option<ClientAggregate>, AppError>;

    /// Loads a client by document with its complete credit request history.
    async fn find_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<ClientAggregate>, AppError>;

    async fn list_all(&self) -> Result<Vec<Client>, AppError>;

    /// Inserts a client and returns it with its assigned id.
    async fn create(&self, client: NewClient) -> Result<Client, AppError>;

    /// Replaces the stored client with the same id.
    async fn update(&self, client: &Client) -> Result<(), AppError>;

    async fn delete(&self, id: ClientId) -> Result<(), AppError>;
}

/// Credit request persistence consumed by the services.
#[async_trait]
pub trait CreditRequestRepository: Send + Sync {
    /// Inserts a request; fails with `InvalidClientReference` if the owner is gone.
    async fn create_credit_request(
        &self,
        request: NewCreditRequest,
    ) -> Result<CreditRequest, AppError>;

    async fn find_credit_request(
        &self,
        id: CreditRequestId,
    ) -> Result<Option<CreditRequest>, AppError>;

    /// Compare-and-swap update: writes `request` only if the stored status is
    /// still `expected`.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - The request was written.
    /// * `Ok(false)` - The stored status changed concurrently; nothing was written.
    async fn update_credit_request(
        &self,
        request: &CreditRequest,
        expected: CreditStatus,
    ) -> Result<bool, AppError>;
}
