// ============================================================================
// Fetch Scheduler
// ============================================================================
// Décide QUAND appeler l'API de marché :
// - intervalle minimum entre deux appels (60s par défaut)
// - report automatique si on est appelé trop tôt
// - nouvel essai après un échec, avec backoff exponentiel plafonné
// - signal de phase de chargement (initial bloquant / rafraîchissement)
//
// CONCEPTS RUST :
// 1. Le scheduler ne possède pas les données : il retourne un FetchOutcome,
//    c'est l'App qui l'applique (séparation décision / état)
// 2. Temps injecté : invoke(now) prend un Instant, les tests contrôlent le temps
// 3. Un seul appel en cours : run() attend chaque invocation avant de dormir
// ============================================================================

use std::sync::mpsc;
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use crate::api::MarketSource;
use crate::config::Config;
use crate::models::AssetRecord;

// ============================================================================
// Types publics
// ============================================================================

/// Phase de chargement signalée au renderer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadingPhase {
    /// Aucune requête en cours
    #[default]
    Idle,

    /// Première requête (aucune donnée encore) : écran d'attente bloquant
    InitialBlocking,

    /// Rafraîchissement : indicateur discret, la liste reste affichée
    Refreshing,
}

/// Résultat d'une invocation du scheduler
#[derive(Debug)]
pub enum FetchOutcome {
    /// Appelé trop tôt : aucun appel réseau, réessayer après `wait`
    Deferred { wait: Duration },

    /// Nouveau snapshot complet
    Fetched(Vec<AssetRecord>),

    /// Échec uniforme (réseau, statut HTTP, JSON) ; nouvel essai dans `retry_in`
    ///
    /// `streak` : échecs consécutifs, celui-ci compris.
    /// `at_ceiling` : le backoff a atteint son plafond (circuit ouvert).
    Failed {
        error: String,
        retry_in: Duration,
        streak: u32,
        at_ceiling: bool,
    },
}

/// Résultat + délai avant la prochaine invocation
#[derive(Debug)]
pub struct Invocation {
    pub outcome: FetchOutcome,
    pub next_delay: Duration,
}

/// Événements envoyés par le worker au thread UI
#[derive(Debug)]
pub enum SchedulerEvent {
    /// Une requête part, avec la phase à afficher
    FetchStarted(LoadingPhase),

    /// Invocation terminée
    Finished(FetchOutcome),
}

// ============================================================================
// Politique de nouvel essai
// ============================================================================

/// Délais du scheduler
///
/// CONCEPT : Backoff exponentiel plafonné
/// - n-ième échec consécutif : min_interval × 2^(n-1)
/// - jamais plus que max_backoff
/// - les essais ne s'arrêtent jamais (le tableau de bord doit se rétablir seul)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub min_interval: Duration,
    pub max_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(min_interval: Duration, max_backoff: Duration) -> Self {
        Self {
            min_interval,
            max_backoff: max_backoff.max(min_interval),
        }
    }

    /// Délai après `failures` échecs consécutifs (>= 1)
    pub fn delay_after(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1);
        let factor = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);

        self.min_interval
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(600))
    }
}

// ============================================================================
// Structure Scheduler
// ============================================================================

/// Scheduler des appels à l'API de marché
#[derive(Debug, Clone)]
pub struct Scheduler {
    policy: RetryPolicy,

    /// Instant du dernier fetch réussi (None avant le premier succès)
    last_success: Option<Instant>,

    /// Nombre d'échecs depuis le dernier succès
    consecutive_failures: u32,
}

impl Scheduler {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            last_success: None,
            consecutive_failures: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(RetryPolicy::new(config.min_interval(), config.max_backoff()))
    }

    /// Temps restant avant qu'un appel soit autorisé
    ///
    /// None si un appel est autorisé maintenant (jamais de succès, ou
    /// intervalle minimum écoulé).
    pub fn remaining_wait(&self, now: Instant) -> Option<Duration> {
        let last = self.last_success?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < self.policy.min_interval {
            Some(self.policy.min_interval - elapsed)
        } else {
            None
        }
    }

    /// Phase à afficher pendant la prochaine requête
    pub fn phase_for_request(&self) -> LoadingPhase {
        if self.last_success.is_none() {
            LoadingPhase::InitialBlocking
        } else {
            LoadingPhase::Refreshing
        }
    }

    /// Vrai quand le backoff a atteint son plafond
    pub fn circuit_open(&self) -> bool {
        self.consecutive_failures > 0
            && self.policy.delay_after(self.consecutive_failures) >= self.policy.max_backoff
    }

    /// Une invocation : soit report, soit exactement un appel à la source
    ///
    /// CONCEPT : Erreurs absorbées à la frontière
    /// - L'erreur de la source devient FetchOutcome::Failed
    /// - Rien n'est jamais propagé à l'appelant : la boucle ne s'arrête pas
    pub async fn invoke<S>(&mut self, source: &S, now: Instant) -> Invocation
    where
        S: MarketSource + ?Sized,
    {
        if let Some(wait) = self.remaining_wait(now) {
            debug!(wait_ms = wait.as_millis() as u64, "Fetch deferred by minimum interval");
            return Invocation {
                outcome: FetchOutcome::Deferred { wait },
                next_delay: wait,
            };
        }

        match source.fetch_markets().await {
            Ok(records) => {
                self.last_success = Some(now);
                if self.consecutive_failures > 0 {
                    info!(failures = self.consecutive_failures, "Fetch recovered");
                }
                self.consecutive_failures = 0;

                Invocation {
                    outcome: FetchOutcome::Fetched(records),
                    next_delay: self.policy.min_interval,
                }
            }
            Err(e) => {
                self.consecutive_failures = self.consecutive_failures.saturating_add(1);
                let retry_in = self.policy.delay_after(self.consecutive_failures);
                let at_ceiling = self.circuit_open();

                if at_ceiling {
                    error!(error = ?e, failures = self.consecutive_failures, retry_s = retry_in.as_secs(), "Fetch failed, backoff at ceiling");
                } else {
                    warn!(error = ?e, failures = self.consecutive_failures, retry_s = retry_in.as_secs(), "Fetch failed, retry scheduled");
                }

                Invocation {
                    outcome: FetchOutcome::Failed {
                        error: format!("{:#}", e),
                        retry_in,
                        streak: self.consecutive_failures,
                        at_ceiling,
                    },
                    next_delay: retry_in,
                }
            }
        }
    }

    /// Boucle infinie du worker : invoque, envoie le résultat, dort
    ///
    /// S'arrête seulement quand le récepteur (thread UI) a disparu.
    pub async fn run<S>(mut self, source: &S, events: mpsc::Sender<SchedulerEvent>)
    where
        S: MarketSource + ?Sized,
    {
        info!(
            min_interval_s = self.policy.min_interval.as_secs(),
            max_backoff_s = self.policy.max_backoff.as_secs(),
            "Scheduler started"
        );

        loop {
            let now = Instant::now();
            if self.remaining_wait(now).is_none()
                && events
                    .send(SchedulerEvent::FetchStarted(self.phase_for_request()))
                    .is_err()
            {
                break;
            }

            let invocation = self.invoke(source, now).await;
            let delay = invocation.next_delay;

            if events.send(SchedulerEvent::Finished(invocation.outcome)).is_err() {
                break;
            }

            tokio::time::sleep(delay).await;
        }

        info!("Scheduler stopped (UI channel closed)");
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}

/// Secondes entières pour l'affichage (arrondi supérieur, au moins 1)
pub fn whole_seconds(duration: Duration) -> u64 {
    let millis = duration.as_millis() as u64;
    ((millis + 999) / 1000).max(1)
}

// ============================================================================
// Tests unitaires
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedSource;

    fn records() -> Vec<AssetRecord> {
        vec![AssetRecord::new("bitcoin", "Bitcoin", "btc").with_price(67000.0)]
    }

    #[tokio::test]
    async fn test_first_invocation_fetches() {
        let source = ScriptedSource::new().then_ok(records());
        let mut scheduler = Scheduler::default();

        assert_eq!(scheduler.phase_for_request(), LoadingPhase::InitialBlocking);
        let invocation = scheduler.invoke(&source, Instant::now()).await;

        assert!(matches!(invocation.outcome, FetchOutcome::Fetched(ref r) if r.len() == 1));
        assert_eq!(invocation.next_delay, Duration::from_secs(60));
        assert_eq!(source.calls(), 1);
        assert_eq!(scheduler.phase_for_request(), LoadingPhase::Refreshing);
    }

    #[tokio::test]
    async fn test_second_invocation_too_early_is_deferred() {
        let source = ScriptedSource::new().then_ok(records()).then_ok(records());
        let mut scheduler = Scheduler::default();
        let start = Instant::now();

        scheduler.invoke(&source, start).await;
        let invocation = scheduler
            .invoke(&source, start + Duration::from_secs(20))
            .await;

        match invocation.outcome {
            FetchOutcome::Deferred { wait } => assert_eq!(wait, Duration::from_secs(40)),
            other => panic!("expected Deferred, got {:?}", other),
        }
        assert_eq!(invocation.next_delay, Duration::from_secs(40));
        assert_eq!(source.calls(), 1);

        // Une fois l'intervalle écoulé, l'appel part
        let invocation = scheduler
            .invoke(&source, start + Duration::from_secs(60))
            .await;
        assert!(matches!(invocation.outcome, FetchOutcome::Fetched(_)));
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_failure_before_any_success_is_not_deferred() {
        let source = ScriptedSource::new().then_err("boom").then_err("boom");
        let mut scheduler = Scheduler::default();
        let start = Instant::now();

        scheduler.invoke(&source, start).await;
        // Aucun succès : le gate ne s'applique pas
        assert_eq!(scheduler.remaining_wait(start + Duration::from_secs(1)), None);
        let second = scheduler.invoke(&source, start + Duration::from_secs(1)).await;

        assert_eq!(source.calls(), 2);
        assert!(matches!(second.outcome, FetchOutcome::Failed { streak: 2, .. }));
        assert_eq!(scheduler.phase_for_request(), LoadingPhase::InitialBlocking);
    }

    #[tokio::test]
    async fn test_failures_back_off_and_success_resets() {
        let source = ScriptedSource::new()
            .then_err("timeout")
            .then_err("HTTP 429")
            .then_ok(records());
        let mut scheduler = Scheduler::default();
        let start = Instant::now();

        let first = scheduler.invoke(&source, start).await;
        assert_eq!(first.next_delay, Duration::from_secs(60));
        match first.outcome {
            FetchOutcome::Failed { ref error, retry_in, streak, at_ceiling } => {
                assert!(error.contains("timeout"));
                assert_eq!(retry_in, Duration::from_secs(60));
                assert_eq!(streak, 1);
                assert!(!at_ceiling);
            }
            ref other => panic!("expected Failed, got {:?}", other),
        }

        let second = scheduler.invoke(&source, start + first.next_delay).await;
        assert_eq!(second.next_delay, Duration::from_secs(120));

        let third = scheduler
            .invoke(&source, start + Duration::from_secs(180))
            .await;
        assert!(matches!(third.outcome, FetchOutcome::Fetched(_)));
        assert_eq!(third.next_delay, Duration::from_secs(60));
        assert!(!scheduler.circuit_open());

        // Le compteur repart de zéro après un succès
        let fourth = scheduler.invoke(&source, start + Duration::from_secs(240)).await;
        assert!(matches!(fourth.outcome, FetchOutcome::Failed { streak: 1, .. }));
    }

    #[test]
    fn test_retry_policy_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(60));
        assert_eq!(policy.delay_after(2), Duration::from_secs(120));
        assert_eq!(policy.delay_after(3), Duration::from_secs(240));
        assert_eq!(policy.delay_after(4), Duration::from_secs(480));
        assert_eq!(policy.delay_after(5), Duration::from_secs(600));
        assert_eq!(policy.delay_after(40), Duration::from_secs(600));
        assert_eq!(policy.delay_after(u32::MAX), Duration::from_secs(600));
    }

    #[tokio::test]
    async fn test_circuit_opens_at_ceiling() {
        let source = ScriptedSource::new();
        let mut scheduler = Scheduler::default();
        let mut now = Instant::now();

        for failures in 1..=5 {
            let invocation = scheduler.invoke(&source, now).await;
            now += invocation.next_delay;
            assert_eq!(scheduler.circuit_open(), failures == 5);
            match invocation.outcome {
                FetchOutcome::Failed { streak, at_ceiling, .. } => {
                    assert_eq!(streak, failures);
                    assert_eq!(at_ceiling, failures == 5);
                }
                other => panic!("expected Failed, got {:?}", other),
            }
        }
        assert_eq!(source.calls(), 5);
    }

    #[test]
    fn test_whole_seconds() {
        assert_eq!(whole_seconds(Duration::from_millis(40_000)), 40);
        assert_eq!(whole_seconds(Duration::from_millis(39_001)), 40);
        assert_eq!(whole_seconds(Duration::from_millis(10)), 1);
    }

    #[tokio::test]
    async fn test_run_stops_when_receiver_dropped() {
        let source = ScriptedSource::new().then_ok(records());
        let (tx, rx) = mpsc::channel();
        drop(rx);

        // Ne doit pas boucler indéfiniment
        Scheduler::default().run(&source, tx).await;
        assert_eq!(source.calls(), 0);
    }

    #[tokio::test]
    async fn test_run_emits_started_then_finished() {
        tokio::time::pause();

        let source = ScriptedSource::new().then_ok(records());
        let policy = RetryPolicy::new(Duration::from_secs(10), Duration::from_secs(20));
        let (tx, rx) = mpsc::channel();

        // Un seul cycle : le timeout expire pendant le sommeil de 10s
        let cycle = tokio::time::timeout(
            Duration::from_secs(5),
            Scheduler::new(policy).run(&source, tx),
        )
        .await;
        assert!(cycle.is_err());

        let events: Vec<SchedulerEvent> = rx.try_iter().collect();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], SchedulerEvent::FetchStarted(LoadingPhase::InitialBlocking)));
        assert!(matches!(events[1], SchedulerEvent::Finished(FetchOutcome::Fetched(ref r)) if r.len() == 1));
        assert_eq!(source.calls(), 1);
    }
}
