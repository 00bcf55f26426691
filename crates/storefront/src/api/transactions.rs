//! Transaction submission and admin listing.

use secrecy::SecretString;
use solsplit_core::{TransactionRecord, TransactionSummary};
use tracing::instrument;

use super::{ApiClient, ApiError, bearer, ensure_success, read_json};

impl ApiClient {
    /// Store a completed purchase.
    ///
    /// Stock changes with every order, so the catalog cache is dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the backend rejects the record.
    #[instrument(skip(self, record, token), fields(transaction_hash = %record.transaction_hash))]
    pub async fn submit_transaction(
        &self,
        record: &TransactionRecord,
        token: &SecretString,
    ) -> Result<(), ApiError> {
        let request = self.http().post(self.endpoint("/api/transaction")).json(record);

        let response = bearer(request, token).send().await?;
        ensure_success(response).await?;
        self.invalidate_catalog().await;
        Ok(())
    }

    /// All recorded transactions (admin only).
    ///
    /// # Errors
    ///
    /// Returns error if the request fails or the token lacks admin rights.
    #[instrument(skip(self, token))]
    pub async fn transactions(
        &self,
        token: &SecretString,
    ) -> Result<Vec<TransactionSummary>, ApiError> {
        let response = bearer(self.http().get(self.endpoint("/api/getAll")), token)
            .send()
            .await?;
        let response = ensure_success(response).await?;
        read_json(response).await
    }
}
