use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::services::pairing_workflow::PairingHandle;

/// Workflows de pareamento em andamento, indexados pelo id devolvido à tela
#[derive(Debug, Clone, Default)]
pub struct PairingRegistry {
    handles: Arc<RwLock<HashMap<Uuid, Arc<PairingHandle>>>>,
    starting: Arc<Mutex<HashSet<String>>>,
}

/// Libera a instância ao sair de escopo
#[derive(Debug)]
pub struct InstanceReservation {
    starting: Arc<Mutex<HashSet<String>>>,
    instance_name: String,
}

impl Drop for InstanceReservation {
    fn drop(&mut self) {
        let mut starting = match self.starting.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        starting.remove(&self.instance_name);
    }
}

impl PairingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, handle: PairingHandle) -> Arc<PairingHandle> {
        let handle = Arc::new(handle);
        self.handles.write().await.insert(handle.id(), Arc::clone(&handle));
        handle
    }

    pub async fn get(&self, id: &Uuid) -> Option<Arc<PairingHandle>> {
        self.handles.read().await.get(id).cloned()
    }

    /// Cancela o workflow. O handle continua registrado para a tela ler o estado final.
    pub async fn cancel(&self, id: &Uuid) -> bool {
        match self.handles.read().await.get(id) {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }

    /// Workflow ainda não terminado da instância, se houver
    pub async fn live_for_instance(&self, instance_name: &str) -> Option<Arc<PairingHandle>> {
        self.handles
            .read()
            .await
            .values()
            .find(|handle| handle.instance_name() == instance_name && !handle.snapshot().state.is_terminal())
            .cloned()
    }

    /// Reserva a instância enquanto um início de pareamento está em curso.
    /// `None` se outro início da mesma instância ainda não terminou.
    pub fn reserve(&self, instance_name: &str) -> Option<InstanceReservation> {
        let mut starting = match self.starting.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };

        if !starting.insert(instance_name.to_string()) {
            return None;
        }

        Some(InstanceReservation {
            starting: Arc::clone(&self.starting),
            instance_name: instance_name.to_string(),
        })
    }

    /// Remove workflows terminados há mais de `retention`
    pub async fn prune_finished(&self, retention: Duration) -> usize {
        let now = Utc::now();
        let mut handles = self.handles.write().await;
        let before = handles.len();

        handles.retain(|_, handle| {
            let snapshot = handle.snapshot();
            match snapshot.finished_at {
                Some(finished_at) if snapshot.state.is_terminal() => now - finished_at < retention,
                _ => true,
            }
        });

        before - handles.len()
    }

    /// Usado no desligamento do servidor
    pub async fn cancel_all(&self) {
        let handles = self.handles.read().await;
        for handle in handles.values() {
            handle.cancel();
        }
        if !handles.is_empty() {
            tracing::info!("🛑 {} pareamento(s) cancelado(s) no desligamento", handles.len());
        }
    }

    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }
}
