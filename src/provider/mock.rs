//! In-process wallet provider for tests and offline use
//!
//! "Signs" by wrapping the bare transaction in a `SignedTransaction` whose
//! signature is the SHA-256 digest of the unsigned encoding. No key material
//! is involved.

use crate::provider::{
    with_timeout, ProviderError, ResponseLayout, WalletProvider, ERR_UNSUPPORTED,
};
use crate::session::{WalletAccount, WalletId};
use crate::signing::{SignRequestItem, SignedEntry};
use crate::txn::{SignedTransaction, Transaction, TxnError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Representation used for signed entries in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EntryFormat {
    #[default]
    Base64,
    Bytes,
    Indexed,
}

/// Configurable mock wallet backend
#[derive(Debug)]
pub struct MockProvider {
    id: WalletId,
    accounts: Vec<WalletAccount>,
    layout: ResponseLayout,
    entry_format: EntryFormat,
    /// Slot indexes the "user" declines to sign
    skip: HashSet<usize>,
    sign_failure: Option<ProviderError>,
    connect_failure: Option<ProviderError>,
    resume_failure: Option<ProviderError>,
    session_alive: bool,
    delay: Option<Duration>,
    requests: Mutex<Vec<Vec<SignRequestItem>>>,
    connect_calls: AtomicUsize,
    disconnect_calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(id: WalletId, accounts: Vec<WalletAccount>) -> Self {
        Self {
            id,
            accounts,
            layout: ResponseLayout::Auto,
            entry_format: EntryFormat::default(),
            skip: HashSet::new(),
            sign_failure: None,
            connect_failure: None,
            resume_failure: None,
            session_alive: true,
            delay: None,
            requests: Mutex::new(Vec::new()),
            connect_calls: AtomicUsize::new(0),
            disconnect_calls: AtomicUsize::new(0),
        }
    }

    /// Respond sparsely (`Sparse`) or with one entry per slot (anything else)
    pub fn with_layout(mut self, layout: ResponseLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_entry_format(mut self, format: EntryFormat) -> Self {
        self.entry_format = format;
        self
    }

    pub fn skipping(mut self, indexes: &[usize]) -> Self {
        self.skip = indexes.iter().copied().collect();
        self
    }

    pub fn failing_with(mut self, error: ProviderError) -> Self {
        self.sign_failure = Some(error);
        self
    }

    pub fn failing_connect(mut self, error: ProviderError) -> Self {
        self.connect_failure = Some(error);
        self
    }

    pub fn failing_resume(mut self, error: ProviderError) -> Self {
        self.resume_failure = Some(error);
        self
    }

    /// Resume reports that the backend session is gone
    pub fn without_session(mut self) -> Self {
        self.session_alive = false;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Every batch received so far
    pub fn recorded_requests(&self) -> Vec<Vec<SignRequestItem>> {
        match self.requests.lock() {
            Ok(requests) => requests.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn connect_calls(&self) -> usize {
        self.connect_calls.load(Ordering::SeqCst)
    }

    pub fn disconnect_calls(&self) -> usize {
        self.disconnect_calls.load(Ordering::SeqCst)
    }

    /// Signed encoding this provider produces for an unsigned encoding
    pub fn sign_bytes(unsigned: &[u8]) -> Result<Vec<u8>, TxnError> {
        let txn = Transaction::decode(unsigned)?;
        let sig = hex::encode(Sha256::digest(unsigned));
        SignedTransaction::new(txn, sig).encode()
    }

    fn entry(&self, signed: Vec<u8>) -> SignedEntry {
        match self.entry_format {
            EntryFormat::Base64 => SignedEntry::Base64(STANDARD.encode(signed)),
            EntryFormat::Bytes => SignedEntry::Bytes(signed),
            EntryFormat::Indexed => SignedEntry::Indexed(
                signed
                    .into_iter()
                    .enumerate()
                    .map(|(i, b)| (i.to_string(), b))
                    .collect::<BTreeMap<_, _>>(),
            ),
        }
    }

    fn respond(
        &self,
        requests: &[SignRequestItem],
    ) -> Result<Vec<Option<SignedEntry>>, ProviderError> {
        let mut response = Vec::with_capacity(requests.len());
        for (index, item) in requests.iter().enumerate() {
            if !item.should_sign() {
                if self.layout != ResponseLayout::Sparse {
                    response.push(None);
                }
                continue;
            }
            if self.skip.contains(&index) {
                response.push(None);
                continue;
            }

            let signed = item
                .txn_bytes()
                .and_then(|unsigned| Self::sign_bytes(&unsigned))
                .map_err(|e| ProviderError {
                    data: Some(serde_json::json!({ "index": index })),
                    ..ProviderError::new(ERR_UNSUPPORTED, &e.to_string())
                })?;
            response.push(Some(self.entry(signed)));
        }
        Ok(response)
    }
}

#[async_trait]
impl WalletProvider for MockProvider {
    fn id(&self) -> WalletId {
        self.id
    }

    fn response_layout(&self) -> ResponseLayout {
        self.layout
    }

    async fn connect(&self) -> Result<Vec<WalletAccount>, ProviderError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        match &self.connect_failure {
            Some(e) => Err(e.clone()),
            None => Ok(self.accounts.clone()),
        }
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.disconnect_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn resume_session(&self) -> Result<Option<Vec<WalletAccount>>, ProviderError> {
        if let Some(e) = &self.resume_failure {
            return Err(e.clone());
        }
        Ok(self.session_alive.then(|| self.accounts.clone()))
    }

    async fn sign_batch(
        &self,
        requests: &[SignRequestItem],
        timeout: Option<Duration>,
    ) -> Result<Vec<Option<SignedEntry>>, ProviderError> {
        match self.requests.lock() {
            Ok(mut recorded) => recorded.push(requests.to_vec()),
            Err(poisoned) => poisoned.into_inner().push(requests.to_vec()),
        }

        with_timeout(timeout, async {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if let Some(e) = &self.sign_failure {
                return Err(e.clone());
            }
            self.respond(requests)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(sender: &str, sign: bool) -> SignRequestItem {
        let bytes = Transaction::payment(sender, "X", 1).encode().unwrap();
        if sign {
            SignRequestItem::to_sign(&bytes)
        } else {
            SignRequestItem::skip(&bytes)
        }
    }

    #[tokio::test]
    async fn test_full_length_response() {
        let provider = MockProvider::new(WalletId::Pera, vec![]);
        let response = provider
            .sign_batch(&[item("A", true), item("B", false)], None)
            .await
            .unwrap();
        assert_eq!(response.len(), 2);
        assert!(response[0].is_some());
        assert!(response[1].is_none());
        assert_eq!(provider.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_sparse_response() {
        let provider =
            MockProvider::new(WalletId::Pera, vec![]).with_layout(ResponseLayout::Sparse);
        let response = provider
            .sign_batch(&[item("A", false), item("B", true)], None)
            .await
            .unwrap();
        assert_eq!(response.len(), 1);
    }

    #[tokio::test]
    async fn test_signed_bytes_wrap_transaction() {
        let unsigned = Transaction::payment("A", "X", 1).encode().unwrap();
        let signed = MockProvider::sign_bytes(&unsigned).unwrap();
        let decoded = SignedTransaction::decode(&signed).unwrap();
        assert_eq!(decoded.txn.encode().unwrap(), unsigned);
        assert_eq!(decoded.sig.len(), 64);
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let accounts = vec![WalletAccount::new("A", "ADDR1")];
        let provider = MockProvider::new(WalletId::Kmd, accounts.clone());
        assert_eq!(provider.connect().await.unwrap(), accounts);
        assert_eq!(provider.resume_session().await.unwrap(), Some(accounts));
        provider.disconnect().await.unwrap();
        assert_eq!(provider.connect_calls(), 1);
        assert_eq!(provider.disconnect_calls(), 1);

        let gone = MockProvider::new(WalletId::Kmd, vec![]).without_session();
        assert_eq!(gone.resume_session().await.unwrap(), None);
    }
}
