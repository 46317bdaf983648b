//! Workflow de pareamento de uma instância WhatsApp
//!
//! Uma única task dirige o pareamento inteiro. Ela é dona dos três relógios
//! (consulta de status, prazo da tentativa e progresso) e os seleciona no mesmo
//! `tokio::select!`, então nenhum callback roda depois de um estado terminal:
//!
//! ```text
//! Idle ──create ok──▶ Polling{1} ──prazo──▶ Polling{2} ... Polling{max} ──prazo──▶ Aborted{TimeoutExhausted}
//!                        │                                     │
//!                        └──────────── status "open" ──────────┴──▶ Connected{3,2,1} ──▶ Closed
//!
//! cancel() em qualquer ponto ──▶ Aborted{Cancelled}
//! ```
//!
//! O QR inicial vem de `create`; as tentativas seguintes usam apenas `refresh`
//! (connect), porque recriar a instância pode duplicá-la no provedor.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use evolution::{ConnectionState, QrCode};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};
use uuid::Uuid;

use crate::models::{
    AbortReason, ConnectionStatusSample, ConnectionType, NewConnectionRecord, PairingAttempt,
    PairingRequest, PairingSnapshot, PairingState,
};
use crate::services::provisioning::{ConnectionStore, PairingError, Provisioning};
use crate::utils::logging::*;
use crate::utils::normalization::{format_registro_timestamp, normalize_instance_name, normalize_phone};

#[derive(Debug, Clone)]
pub struct PairingConfig {
    /// Intervalo entre consultas de status (3s)
    pub poll_interval: Duration,
    /// Validade de cada QR antes de pedir outro (30s)
    pub attempt_timeout: Duration,
    /// Tick da barra de progresso, só visual (100ms)
    pub progress_tick: Duration,
    pub max_attempts: u32,
    /// Segundos exibidos antes de fechar depois de conectar
    pub close_countdown: u32,
    /// Fuso civil fixo usado em `data_hora`
    pub timezone: FixedOffset,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            attempt_timeout: Duration::from_secs(30),
            progress_tick: Duration::from_millis(100),
            max_attempts: 5,
            close_countdown: 3,
            timezone: FixedOffset::west_opt(3 * 3600).unwrap_or_else(|| Utc.fix()),
        }
    }
}

/// Progresso da tentativa atual, em `[0, 100]`
pub fn progress_percent(elapsed: Duration, timeout: Duration) -> f64 {
    if timeout.is_zero() {
        return 100.0;
    }
    (elapsed.as_secs_f64() / timeout.as_secs_f64() * 100.0).clamp(0.0, 100.0)
}

/// Fábrica de workflows com as dependências já resolvidas
pub struct PairingWorkflow<P, S> {
    config: PairingConfig,
    provisioning: Arc<P>,
    store: Arc<S>,
}

impl<P, S> Clone for PairingWorkflow<P, S> {
    fn clone(&self) -> Self {
        Self {
            config: self.config.clone(),
            provisioning: Arc::clone(&self.provisioning),
            store: Arc::clone(&self.store),
        }
    }
}

impl<P: Provisioning, S: ConnectionStore> PairingWorkflow<P, S> {
    pub fn new(config: PairingConfig, provisioning: Arc<P>, store: Arc<S>) -> Self {
        Self {
            config,
            provisioning,
            store,
        }
    }

    pub fn config(&self) -> &PairingConfig {
        &self.config
    }

    /// Executa a etapa de aquisição do QR e, se ela der certo, dispara a task do workflow.
    ///
    /// Se a criação falhar nenhum relógio é iniciado e o erro volta para quem chamou.
    pub async fn start(&self, request: PairingRequest) -> Result<PairingHandle, PairingError> {
        let instance_name = normalize_instance_name(&request.nome);
        if instance_name.is_empty() {
            return Err(PairingError::Validation("Nome do WhatsApp é obrigatório".to_string()));
        }
        let number = normalize_phone(&request.numero);

        let qr = self.provisioning.create_instance(&instance_name, &number).await?;

        let id = Uuid::new_v4();
        let attempt = PairingAttempt::new(&instance_name, qr, 1);

        let mut snapshot = PairingSnapshot::idle(&instance_name, self.config.max_attempts);
        snapshot.state = PairingState::Polling { attempt: 1 };
        snapshot.attempt = Some(attempt);

        let (snapshot_tx, snapshot_rx) = watch::channel(snapshot);
        let (cancel_tx, cancel_rx) = watch::channel(false);

        log_pairing_started(&instance_name, 1);

        let driver = Driver {
            id,
            config: self.config.clone(),
            user_id: request.id_usuario,
            instance_name: instance_name.clone(),
            number,
            provisioning: Arc::clone(&self.provisioning),
            store: Arc::clone(&self.store),
            snapshot: snapshot_tx,
            cancel: cancel_rx,
        };

        let task = tokio::spawn(driver.run());

        Ok(PairingHandle {
            id,
            instance_name,
            user_id: request.id_usuario,
            connection_type: request.tipo,
            snapshot: snapshot_rx,
            cancel: cancel_tx,
            task: Mutex::new(Some(task)),
        })
    }
}

/// Handle de um workflow em andamento. `cancel()` encerra todos os relógios de uma vez.
#[derive(Debug)]
pub struct PairingHandle {
    id: Uuid,
    instance_name: String,
    user_id: i64,
    connection_type: ConnectionType,
    snapshot: watch::Receiver<PairingSnapshot>,
    cancel: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl PairingHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn instance_name(&self) -> &str {
        &self.instance_name
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn connection_type(&self) -> ConnectionType {
        self.connection_type
    }

    pub fn snapshot(&self) -> PairingSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PairingSnapshot> {
        self.snapshot.clone()
    }

    /// Fecha o workflow. Idempotente; respostas que chegarem depois são ignoradas.
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    /// A task terminou (nenhum relógio vivo)
    pub fn is_finished(&self) -> bool {
        match self.task.lock() {
            Ok(guard) => guard.as_ref().map_or(true, JoinHandle::is_finished),
            Err(_) => true,
        }
    }

    /// Espera a task terminar e devolve o snapshot final
    pub async fn wait(&self) -> PairingSnapshot {
        let task = self.task.lock().ok().and_then(|mut guard| guard.take());

        match task {
            Some(task) => {
                if let Err(e) = task.await {
                    log_error(&format!("❌ Task de pareamento {} terminou com erro: {}", self.id, e));
                }
            }
            None => {
                let mut rx = self.snapshot.clone();
                let _ = rx.wait_for(|s| s.state.is_terminal()).await;
            }
        }

        self.snapshot()
    }
}

impl Drop for PairingHandle {
    fn drop(&mut self) {
        self.cancel.send_replace(true);
    }
}

/// Requisição à Evolution API em andamento, dona dos próprios dados
type InFlight<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type PollResult = Result<Option<ConnectionState>, PairingError>;
type RefreshResult = Result<QrCode, PairingError>;

enum Outcome {
    Connected,
    Aborted(AbortReason),
}

struct Driver<P, S> {
    id: Uuid,
    config: PairingConfig,
    user_id: i64,
    instance_name: String,
    number: String,
    provisioning: Arc<P>,
    store: Arc<S>,
    snapshot: watch::Sender<PairingSnapshot>,
    cancel: watch::Receiver<bool>,
}

impl<P: Provisioning, S: ConnectionStore> Driver<P, S> {
    async fn run(mut self) {
        match self.watch_connection().await {
            Outcome::Connected => self.finalize().await,
            Outcome::Aborted(reason) => self.abort(reason),
        }
    }

    /// Poller + controlador de tentativas. Sai no primeiro "open", no cancelamento
    /// ou quando as tentativas acabam; ao sair, os três relógios são descartados juntos.
    ///
    /// Consultas e renovações rodam como futures em voo dentro do loop, nunca
    /// dentro de um braço do `select!`: uma API lenta não segura o prazo nem o progresso.
    async fn watch_connection(&mut self) -> Outcome {
        let poll_every = self.config.poll_interval;
        let timeout = self.config.attempt_timeout;
        let tick = self.config.progress_tick;

        let mut attempt: u32 = 1;
        let mut attempt_started = Instant::now();

        let mut poll = interval_at(attempt_started + poll_every, poll_every);
        poll.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut progress = interval_at(attempt_started + tick, tick);
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let deadline = sleep(timeout);
        tokio::pin!(deadline);

        let mut poll_in_flight: Option<InFlight<PollResult>> = None;
        let mut refresh_in_flight: Option<InFlight<RefreshResult>> = None;

        loop {
            tokio::select! {
                biased;

                _ = cancelled(&mut self.cancel) => {
                    return Outcome::Aborted(AbortReason::Cancelled);
                }

                // Resposta já recebida vem antes do prazo: um "open" que chegou não se perde
                result = in_flight(&mut poll_in_flight), if poll_in_flight.is_some() => {
                    poll_in_flight = None;

                    match result {
                        Ok(Some(state)) => {
                            let open = state.is_open();
                            let sample = ConnectionStatusSample {
                                instance_name: self.instance_name.clone(),
                                state,
                                sampled_at: Utc::now(),
                            };
                            self.snapshot.send_modify(|s| s.last_sample = Some(sample));

                            if open {
                                return Outcome::Connected;
                            }
                        }
                        Ok(None) => {
                            tracing::debug!("Instância '{}' ainda não aparece em fetchInstances", self.instance_name);
                        }
                        Err(e) => {
                            tracing::debug!("Consulta de status de '{}' ignorada: {}", self.instance_name, e);
                        }
                    }
                }

                result = in_flight(&mut refresh_in_flight), if refresh_in_flight.is_some() => {
                    refresh_in_flight = None;

                    match result {
                        Ok(qr) => {
                            self.publish_attempt(qr, attempt);
                            log_pairing_refreshed(&self.instance_name, attempt, self.config.max_attempts);
                        }
                        Err(e) => {
                            // Mantém o QR anterior; a tentativa conta mesmo assim
                            log_warning(&format!(
                                "⚠️ Falha ao renovar QR de '{}' (tentativa {}/{}): {}",
                                self.instance_name, attempt, self.config.max_attempts, e
                            ));
                            self.snapshot.send_modify(|s| {
                                if let Some(current) = s.attempt.as_mut() {
                                    current.attempt_number = attempt;
                                }
                            });
                        }
                    }
                }

                // Antes dos ticks: nenhum tick pronto pode atrasar o prazo
                _ = &mut deadline => {
                    if attempt >= self.config.max_attempts {
                        return Outcome::Aborted(AbortReason::TimeoutExhausted { attempts: attempt });
                    }
                    attempt += 1;

                    if refresh_in_flight.is_some() {
                        log_warning(&format!(
                            "⚠️ Renovação anterior de '{}' ainda sem resposta; descartada",
                            self.instance_name
                        ));
                    }
                    refresh_in_flight = Some(self.start_refresh());

                    attempt_started = Instant::now();
                    deadline.as_mut().reset(attempt_started + timeout);
                    progress.reset();
                    self.snapshot.send_modify(|s| {
                        s.state = PairingState::Polling { attempt };
                        s.progress = 0.0;
                    });
                }

                _ = poll.tick() => {
                    if poll_in_flight.is_some() {
                        tracing::debug!("Consulta anterior de '{}' ainda em voo; tick ignorado", self.instance_name);
                    } else {
                        poll_in_flight = Some(self.start_poll());
                    }
                }

                _ = progress.tick() => {
                    let value = progress_percent(attempt_started.elapsed(), timeout);
                    self.snapshot.send_modify(|s| s.progress = value);
                }
            }
        }
    }

    fn start_poll(&self) -> InFlight<PollResult> {
        let provisioning = Arc::clone(&self.provisioning);
        let instance_name = self.instance_name.clone();
        Box::pin(async move { provisioning.connection_state(&instance_name).await })
    }

    fn start_refresh(&self) -> InFlight<RefreshResult> {
        let provisioning = Arc::clone(&self.provisioning);
        let instance_name = self.instance_name.clone();
        let number = self.number.clone();
        Box::pin(async move { provisioning.refresh_qr(&instance_name, &number).await })
    }

    fn publish_attempt(&self, qr: QrCode, attempt: u32) {
        let next = PairingAttempt::new(&self.instance_name, qr, attempt);
        self.snapshot.send_modify(|s| {
            s.state = PairingState::Polling { attempt };
            s.attempt = Some(next);
            s.progress = 0.0;
        });
    }

    /// Roda uma única vez por workflow conectado
    async fn finalize(mut self) {
        log_pairing_connected(&self.instance_name);

        let countdown = self.config.close_countdown;
        self.snapshot.send_modify(|s| {
            s.state = PairingState::Connected { closes_in: countdown };
            s.progress = 0.0;
        });

        // Roteamento em segundo plano; falha não derruba a conexão
        let provisioning = Arc::clone(&self.provisioning);
        let instance_name = self.instance_name.clone();
        tokio::spawn(async move {
            if let Err(e) = provisioning.register_routing(&instance_name).await {
                log_warning(&format!("⚠️ Falha ao registrar Chatwoot para '{}': {}", instance_name, e));
            }
        });

        let record = NewConnectionRecord::connected(
            self.user_id,
            &self.instance_name,
            &self.number,
            format_registro_timestamp(Utc::now(), self.config.timezone),
        );

        if let Err(e) = self.store.persist_connection(&record).await {
            log_error(&format!(
                "❌ Instância '{}' conectada mas o registro não foi gravado: {}",
                self.instance_name, e
            ));
            self.snapshot.send_modify(|s| s.persist_error = Some(e.to_string()));
        }

        for remaining in (1..=countdown).rev() {
            self.snapshot.send_modify(|s| s.state = PairingState::Connected { closes_in: remaining });

            tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => break,
                _ = sleep(Duration::from_secs(1)) => {}
            }
        }

        self.snapshot.send_modify(|s| {
            s.state = PairingState::Closed;
            s.finished_at = Some(Utc::now());
        });

        tracing::debug!("Pareamento {} fechado", self.id);
    }

    fn abort(self, reason: AbortReason) {
        let label = match &reason {
            AbortReason::Cancelled => "fechado pelo usuário".to_string(),
            AbortReason::TimeoutExhausted { attempts } => format!("{} tentativas sem leitura do QR", attempts),
        };
        log_pairing_aborted(&self.instance_name, &label);

        let notice = reason.notice();
        self.snapshot.send_modify(|s| {
            s.state = PairingState::Aborted { reason };
            s.notice = notice;
            s.finished_at = Some(Utc::now());
        });
    }
}

/// Resolve quando o handle pede cancelamento. Se o handle sumir sem cancelar,
/// nunca resolve.
async fn cancelled(rx: &mut watch::Receiver<bool>) {
    loop {
        let is_cancelled = *rx.borrow_and_update();
        if is_cancelled {
            return;
        }
        if rx.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

/// Espera a requisição em voo. Com o slot vazio nunca resolve.
async fn in_flight<T>(slot: &mut Option<InFlight<T>>) -> T {
    match slot {
        Some(request) => request.await,
        None => std::future::pending().await,
    }
}
