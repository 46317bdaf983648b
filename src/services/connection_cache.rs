use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::models::ConnectionListing;

/// Cache da listagem de conexões por usuário
///
/// A tela recarrega a lista a cada foco; dentro da janela de validade a
/// resposta sai daqui sem ir ao backend. Qualquer escrita invalida o usuário.
#[derive(Debug, Clone)]
pub struct ConnectionCache {
    entries: Arc<RwLock<HashMap<i64, CachedListing>>>,
    ttl: Duration,
}

#[derive(Debug, Clone)]
struct CachedListing {
    listing: ConnectionListing,
    stored_at: Instant,
}

impl ConnectionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub async fn get(&self, user_id: i64) -> Option<ConnectionListing> {
        let entries = self.entries.read().await;
        let cached = entries.get(&user_id)?;

        // Verificar se ainda está válido (TTL)
        if cached.stored_at.elapsed() < self.ttl {
            Some(cached.listing.clone())
        } else {
            None
        }
    }

    pub async fn put(&self, user_id: i64, listing: ConnectionListing) {
        self.entries.write().await.insert(
            user_id,
            CachedListing {
                listing,
                stored_at: Instant::now(),
            },
        );
    }

    pub async fn invalidate(&self, user_id: i64) {
        if self.entries.write().await.remove(&user_id).is_some() {
            tracing::debug!("Cache de conexões do usuário {} invalidado", user_id);
        }
    }
}
