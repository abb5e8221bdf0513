use crate::errors::AppError;
use crate::models::{
    Client, ClientAggregate, ClientId, CreditRequest, CreditRequestId, CreditStatus, Document,
    NewClient, NewCreditRequest,
};
use crate::repository::{ClientRepository, CreditRequestRepository};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct Tables {
    clients: BTreeMap<ClientId, Client>,
    credit_requests: BTreeMap<CreditRequestId, CreditRequest>,
    next_client_id: ClientId,
    next_request_id: CreditRequestId,
}

impl Tables {
    fn aggregate(&self, client: &Client) -> ClientAggregate {
        let credit_requests = self
            .credit_requests
            .values()
            .filter(|r| r.client_id == client.id)
            .cloned()
            .collect();
        ClientAggregate::new(client.clone(), credit_requests)
    }

    fn next_id(counter: &mut i64, table: &str) -> Result<i64, AppError> {
        *counter = counter
            .checked_add(1)
            .ok_or_else(|| AppError::Storage(format!("{} id sequence exhausted", table)))?;
        Ok(*counter)
    }

    fn document_taken(&self, document: &Document, except: Option<ClientId>) -> bool {
        self.clients
            .values()
            .any(|c| &c.document == document && Some(c.id) != except)
    }
}

/// Storage service keeping clients and credit requests in process memory.
///
/// Ids are assigned sequentially from 1. All writes happen under one lock,
/// so every operation is atomic with respect to the others.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ClientRepository for InMemoryStore {
    async fn find_by_id(&self, id: ClientId) -> Result<Option<ClientAggregate>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.clients.get(&id).map(|c| tables.aggregate(c)))
    }

    async fn find_by_document(
        &self,
        document: &Document,
    ) -> Result<Option<ClientAggregate>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables
            .clients
            .values()
            .find(|c| &c.document == document)
            .map(|c| tables.aggregate(c)))
    }

    async fn list_all(&self) -> Result<Vec<Client>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.clients.values().cloned().collect())
    }

    async fn create(&self, client: NewClient) -> Result<Client, AppError> {
        let mut tables = self.tables.write().await;

        if tables.document_taken(&client.document, None) {
            tracing::warn!(
                "Rejected duplicate document on create: {}",
                client.document.masked()
            );
            return Err(AppError::Conflict(
                "A client with this document is already registered".to_string(),
            ));
        }

        let id = Tables::next_id(&mut tables.next_client_id, "client")?;
        let client = client.into_client(id);
        tables.clients.insert(client.id, client.clone());

        tracing::debug!("Stored client {} ({})", client.id, client.document.masked());
        Ok(client)
    }

    async fn update(&self, client: &Client) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        if !tables.clients.contains_key(&client.id) {
            return Err(AppError::InvalidClientReference(client.id));
        }
        if tables.document_taken(&client.document, Some(client.id)) {
            return Err(AppError::Conflict(
                "A client with this document is already registered".to_string(),
            ));
        }

        tables.clients.insert(client.id, client.clone());
        Ok(())
    }

    async fn delete(&self, id: ClientId) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;

        if !tables.clients.contains_key(&id) {
            return Err(AppError::InvalidClientReference(id));
        }

        let has_open_request = tables
            .credit_requests
            .values()
            .any(|r| r.client_id == id && r.status == CreditStatus::InProgress);
        if has_open_request {
            return Err(AppError::Conflict(format!(
                "Client {} has a credit request in progress",
                id
            )));
        }

        tables.clients.remove(&id);
        tracing::debug!("Deleted client {}", id);
        Ok(())
    }
}

#[async_trait]
impl CreditRequestRepository for InMemoryStore {
    async fn create_credit_request(
        &self,
        request: NewCreditRequest,
    ) -> Result<CreditRequest, AppError> {
        let mut tables = self.tables.write().await;

        if !tables.clients.contains_key(&request.client_id) {
            return Err(AppError::InvalidClientReference(request.client_id));
        }

        let id = Tables::next_id(&mut tables.next_request_id, "credit request")?;
        let request = request.into_request(id);
        tables.credit_requests.insert(request.id, request.clone());

        tracing::debug!(
            "Stored credit request {} for client {}",
            request.id,
            request.client_id
        );
        Ok(request)
    }

    async fn find_credit_request(
        &self,
        id: CreditRequestId,
    ) -> Result<Option<CreditRequest>, AppError> {
        let tables = self.tables.read().await;
        Ok(tables.credit_requests.get(&id).cloned())
    }

    async fn update_credit_request(
        &self,
        request: &CreditRequest,
        expected: CreditStatus,
    ) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;

        let stored = tables
            .credit_requests
            .get_mut(&request.id)
            .ok_or_else(|| AppError::NotFound(format!("Credit request {} not found", request.id)))?;

        if stored.status != expected {
            tracing::debug!(
                "Credit request {} changed concurrently (expected {}, found {})",
                request.id,
                expected,
                stored.status
            );
            return Ok(false);
        }

        *stored = request.clone();
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn new_client(document: &str) -> NewClient {
        NewClient {
            name: "Empresa Exemplo Ltda".to_string(),
            document: Document::parse(document).unwrap(),
            email: None,
            phone: None,
            registered_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let store = InMemoryStore::new();
        let a = store.create(new_client("12345678901")).await.unwrap();
        let b = store.create(new_client("12345678000190")).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(store.list_all().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_exhausted_id_sequence_is_storage_error() {
        let store = InMemoryStore::new();
        store.tables.write().await.next_client_id = ClientId::MAX;

        let err = store.create(new_client("12345678901")).await.unwrap_err();
        assert!(matches!(err, AppError::Storage(_)));
        assert_eq!(err.category(), crate::errors::ErrorCategory::Internal);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_document_uniqueness() {
        let store = InMemoryStore::new();
        let a = store.create(new_client("12345678901")).await.unwrap();
        let err = store.create(new_client("123.456.789-01")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let mut b = store.create(new_client("98765432100")).await.unwrap();
        b.document = a.document.clone();
        assert!(matches!(store.update(&b).await, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_find_by_document_includes_requests() {
        let store = InMemoryStore::new();
        let client = store.create(new_client("12345678901")).await.unwrap();
        store
            .create_credit_request(NewCreditRequest {
                client_id: client.id,
                requested_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
            })
            .await
            .unwrap();

        let aggregate = store
            .find_by_document(&client.document)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(aggregate.client.id, client.id);
        assert_eq!(aggregate.credit_requests.len(), 1);
        assert!(aggregate.has_open_request());
    }

    #[tokio::test]
    async fn test_request_for_unknown_client_is_rejected() {
        let store = InMemoryStore::new();
        let err = store
            .create_credit_request(NewCreditRequest {
                client_id: 99,
                requested_at: Utc::now(),
            })
            .await
            .unwrap_err();
        assert_eq!(err, AppError::InvalidClientReference(99));
    }

    #[tokio::test]
    async fn test_compare_and_swap_update() {
        let store = InMemoryStore::new();
        let client = store.create(new_client("12345678901")).await.unwrap();
        let request = store
            .create_credit_request(NewCreditRequest {
                client_id: client.id,
                requested_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut approved = request.clone();
        approved.status = CreditStatus::Approved;
        assert!(store
            .update_credit_request(&approved, CreditStatus::InProgress)
            .await
            .unwrap());
        assert!(!store
            .update_credit_request(&approved, CreditStatus::InProgress)
            .await
            .unwrap());

        let stored = store.find_credit_request(request.id).await.unwrap().unwrap();
        assert_eq!(stored.status, CreditStatus::Approved);
    }

    #[tokio::test]
    async fn test_delete_refuses_open_requests() {
        let store = InMemoryStore::new();
        let client = store.create(new_client("12345678901")).await.unwrap();
        let request = store
            .create_credit_request(NewCreditRequest {
                client_id: client.id,
                requested_at: Utc::now(),
            })
            .await
            .unwrap();

        assert!(matches!(
            store.delete(client.id).await,
            Err(AppError::Conflict(_))
        ));

        let mut denied = request.clone();
        denied.status = CreditStatus::Denied;
        store
            .update_credit_request(&denied, CreditStatus::InProgress)
            .await
            .unwrap();

        store.delete(client.id).await.unwrap();
        assert!(store.find_by_id(client.id).await.unwrap().is_none());
        // Requests are kept as audit trail
        assert!(store.find_credit_request(request.id).await.unwrap().is_some());
    }
}
