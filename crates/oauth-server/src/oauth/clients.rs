//! Client registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use super::types::Client;

/// In-memory store of registered clients, keyed by client id.
#[derive(Clone, Default)]
pub struct ClientStore {
    clients: Arc<RwLock<HashMap<String, Client>>>,
}

impl ClientStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace a client.
    pub async fn set(&self, client: Client) {
        self.clients.write().await.insert(client.id.clone(), client);
    }

    /// Look up a client by id.
    pub async fn get(&self, client_id: &str) -> Option<Client> {
        self.clients.read().await.get(client_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}

impl FromIterator<Client> for ClientStore {
    fn from_iter<I: IntoIterator<Item = Client>>(iter: I) -> Self {
        let clients = iter.into_iter().map(|c| (c.id.clone(), c)).collect();
        Self { clients: Arc::new(RwLock::new(clients)) }
    }
}

impl std::fmt::Debug for ClientStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientStore").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_set_and_get() {
        let store = ClientStore::new();
        assert!(store.is_empty().await);

        store.set(Client::new("222222", "22222222", "http://localhost:9094")).await;

        let client = store.get("222222").await.unwrap();
        assert_eq!(client.secret, "22222222");
        assert_eq!(client.domain, "http://localhost:9094");
        assert!(store.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_from_iterator() {
        let store: ClientStore = [Client::new("a", "1", "http://a.example"), Client::new("b", "2", "http://b.example")]
            .into_iter()
            .collect();

        assert_eq!(store.len().await, 2);
        assert_eq!(store.get("b").await.unwrap().domain, "http://b.example");
    }

    #[tokio::test]
    async fn test_set_replaces() {
        let store = ClientStore::new();
        store.set(Client::new("c", "old", "http://a.example")).await;
        store.set(Client::new("c", "new", "http://a.example")).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get("c").await.unwrap().secret, "new");
    }
}
