//! Scripted run of a whole session through the use cases.
//!
//! The host creates the session, everyone joins and readies up, and the
//! dialogue is driven round by round with the scribe writing notes before
//! each round closes. Multi-group sessions drive every group in turn from
//! the dashboard.

use dialogos_application::{
    EngineConfig, GroupDashboardUseCase, ManageSessionUseCase, Mutation, RunSessionUseCase,
    SessionEventLogger, SessionServiceError, SessionStore, WatchSessionUseCase,
};
use dialogos_domain::{
    ActorContext, AggregateOutcome, FivePersonChoice, GroupConfiguration, GroupId, GroupMode,
    GroupProgress, ParticipantId, Phase, PhaseChange, Role, Session, SessionConfig, SessionId,
    SessionVariant,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

const HOST_ID: &str = "host";

/// What to simulate
#[derive(Debug, Clone)]
pub struct SimulationSettings {
    /// Roster size, host included
    pub participants: usize,
    pub mode: GroupMode,
    pub variant: SessionVariant,
    pub groups: GroupConfiguration,
    pub five: Option<FivePersonChoice>,
    pub cycles: u32,
    pub free_dialogue: bool,
}

/// One applied host step
#[derive(Debug, Clone)]
pub struct Step {
    pub scope: String,
    pub change: PhaseChange,
}

#[derive(Debug)]
pub struct SimulationReport {
    pub session: Session,
    pub steps: Vec<Step>,
    /// Dashboard snapshot taken before the groups were ended
    pub progress: Vec<GroupProgress>,
    pub aggregates: Vec<(&'static str, AggregateOutcome)>,
    /// Records pushed to a read-only subscriber while the session ran
    pub observed_updates: usize,
}

pub struct Simulator {
    manage: ManageSessionUseCase,
    run: RunSessionUseCase,
    dashboard: GroupDashboardUseCase,
    watch: WatchSessionUseCase,
    host: ActorContext,
}

impl Simulator {
    pub fn new(
        store: Arc<dyn SessionStore>,
        config: EngineConfig,
        logger: Arc<dyn SessionEventLogger>,
        seed: Option<u64>,
    ) -> Self {
        let mut run = RunSessionUseCase::new(store.clone(), config.clone()).with_event_logger(logger.clone());
        if let Some(seed) = seed {
            run = run.with_seed(seed);
        }
        Self {
            manage: ManageSessionUseCase::new(store.clone(), config.clone()).with_event_logger(logger.clone()),
            run,
            dashboard: GroupDashboardUseCase::new(store.clone(), config.clone()).with_event_logger(logger),
            watch: WatchSessionUseCase::new(store, config),
            host: ActorContext::now(HOST_ID),
        }
    }

    pub async fn run(&self, settings: &SimulationSettings) -> Result<SimulationReport, SessionServiceError> {
        let id = self.populate(settings).await?;
        let observed = Arc::new(AtomicUsize::new(0));
        let counter = observed.clone();
        let observer = self.watch.spawn_subscription(&id, move |_| {
            counter.fetch_add(1, Ordering::Relaxed);
        });

        let mut report = SimulationReport {
            session: self.manage.require_session(&id).await?,
            steps: Vec::new(),
            progress: Vec::new(),
            aggregates: Vec::new(),
            observed_updates: 0,
        };

        let started = self.run.start_session(&id, &self.host, settings.five).await?;
        report.push("session", started);

        match settings.mode {
            GroupMode::Single => {
                self.drive(&id, None, settings, &mut report).await?;
                let ended = self.run.end_session(&id, &self.host, None).await?;
                report.push("session", ended);
                if report.session.current_phase == Phase::Reflection {
                    let reflected = self.run.complete_reflection(&id, &self.host, None).await?;
                    report.push("session", reflected);
                }
            }
            GroupMode::Multi => {
                let started = self.dashboard.start_all_groups(&id, &self.host).await?;
                report.aggregates.push(("start", started.outcome));
                report.session = started.session;

                let group_ids: Vec<GroupId> =
                    report.session.groups.iter().map(|g| g.group_id.clone()).collect();
                for group_id in &group_ids {
                    self.drive(&id, Some(group_id), settings, &mut report).await?;
                }
                report.progress = self.dashboard.progress(&id).await?;

                let ended = self.dashboard.end_all_groups(&id, &self.host).await?;
                report.aggregates.push(("end", ended.outcome));
                report.session = ended.session;
            }
        }

        // Let the subscriber drain what was already published
        tokio::task::yield_now().await;
        observer.shutdown().await;
        report.observed_updates = observed.load(Ordering::Relaxed);

        info!(
            "Simulated session {} finished in phase {} after {} steps",
            id,
            report.session.current_phase,
            report.steps.len()
        );
        Ok(report)
    }

    /// Create the session and bring the whole roster in, ready.
    async fn populate(&self, settings: &SimulationSettings) -> Result<SessionId, SessionServiceError> {
        let mut config = SessionConfig::new("Simulated dialogue")
            .with_topic("Listening without interrupting")
            .with_variant(settings.variant)
            .with_participant_limits(2, settings.participants.max(2));

        let session = match settings.mode {
            GroupMode::Single => {
                config.group_configuration = settings.groups.clone();
                self.manage.create_session(&self.host, "Host", config).await?
            }
            GroupMode::Multi => {
                self.manage
                    .create_group_session(&self.host, "Host", config, Some(settings.groups.clone()))
                    .await?
            }
        };
        let id = session.session_id;

        for i in 2..=settings.participants {
            let ctx = ActorContext::now(format!("p{}", i));
            self.manage
                .join_session(&id, &ctx, &format!("Participant {}", i), Role::Unassigned)
                .await?;
            self.manage.update_ready_state(&id, &ctx, true).await?;
        }
        debug!("Session {} populated with {} participants", id, settings.participants);
        Ok(id)
    }

    /// Run one dialogue through check-in and every configured cycle.
    async fn drive(
        &self,
        id: &SessionId,
        group: Option<&GroupId>,
        settings: &SimulationSettings,
        report: &mut SimulationReport,
    ) -> Result<(), SessionServiceError> {
        let scope = group.map_or_else(|| "session".to_string(), |g| g.to_string());
        let cycle_complete = settings.variant.cycle_complete();

        if dialogue_state(&report.session, group).0 == Phase::HelloCheckin {
            let checked_in = self.run.complete_check_in(id, &self.host, group).await?;
            report.push(&scope, checked_in);
        }

        for cycle in 1..=settings.cycles.max(1) {
            if cycle > 1 {
                let repeated = self.run.continue_rounds(id, &self.host, group).await?;
                report.push(&scope, repeated);
            }
            loop {
                self.take_notes(id, group, &scope, &report.session).await?;
                let completed = self.run.complete_round(id, &self.host, group).await?;
                let change = completed.outcome.clone();
                report.push(&scope, completed);
                if change.to == cycle_complete || !change.applied {
                    break;
                }
                let moved_on = self.run.complete_transition(id, &self.host, group).await?;
                report.push(&scope, moved_on);
            }
        }

        if settings.free_dialogue {
            let free = self.run.start_free_dialogue(id, &self.host, group).await?;
            report.push(&scope, free);
        }
        Ok(())
    }

    async fn take_notes(
        &self,
        id: &SessionId,
        group: Option<&GroupId>,
        scope: &str,
        session: &Session,
    ) -> Result<(), SessionServiceError> {
        let Some(scribe) = scribe_of(session, group) else {
            debug!("No scribe in {}, skipping notes", scope);
            return Ok(());
        };
        let round = dialogue_state(session, group).1;
        let notes = format!("Round {} in {}: noted by {}", round, scope, scribe);
        self.manage
            .update_scribe_notes(id, &ActorContext::now(scribe), &notes)
            .await?;
        Ok(())
    }
}

impl SimulationReport {
    fn push(&mut self, scope: &str, mutation: Mutation<PhaseChange>) {
        self.steps.push(Step {
            scope: scope.to_string(),
            change: mutation.outcome,
        });
        self.session = mutation.session;
    }
}

fn dialogue_state(session: &Session, group: Option<&GroupId>) -> (Phase, u32) {
    match group.and_then(|g| session.group(g)) {
        Some(group) => (group.current_phase, group.round_number),
        None => (session.current_phase, session.current_round),
    }
}

fn scribe_of(session: &Session, group: Option<&GroupId>) -> Option<ParticipantId> {
    let members = match group {
        Some(group_id) => &session.group(group_id)?.participants,
        None => &session.participants,
    };
    members
        .iter()
        .find(|p| p.role == Role::Scribe)
        .map(|p| p.id.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dialogos_application::NoSessionEventLogger;
    use dialogos_domain::{GroupStatus, SessionStatus};
    use dialogos_infrastructure::InMemorySessionStore;

    fn simulator(store: Arc<InMemorySessionStore>) -> Simulator {
        Simulator::new(store, EngineConfig::default(), Arc::new(NoSessionEventLogger), Some(7))
    }

    fn settings(participants: usize, mode: GroupMode, variant: SessionVariant) -> SimulationSettings {
        SimulationSettings {
            participants,
            mode,
            variant,
            groups: GroupConfiguration::default(),
            five: None,
            cycles: 1,
            free_dialogue: false,
        }
    }

    #[tokio::test]
    async fn test_single_online_session_runs_to_completion() {
        let store = Arc::new(InMemorySessionStore::new());
        let report = simulator(store.clone())
            .run(&settings(4, GroupMode::Single, SessionVariant::Online))
            .await
            .unwrap();

        assert_eq!(report.session.status, SessionStatus::Completed);
        assert_eq!(report.session.current_phase, Phase::Completed);
        assert_eq!(report.steps[1].change.to, Phase::Listening);
        let last = &report.steps[report.steps.len() - 1].change;
        assert_eq!(last.from, Phase::Reflection);
        assert!(report.session.accumulated_scribe_notes().contains("Round 1"));
        assert!(report.progress.is_empty());
        assert!(report.observed_updates > 0);

        let stored = store
            .get(&report.session.session_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, report.session.version);
    }

    #[tokio::test]
    async fn test_in_person_session_skips_check_in_and_reflection() {
        let store = Arc::new(InMemorySessionStore::new());
        let report = simulator(store)
            .run(&settings(3, GroupMode::Single, SessionVariant::InPerson))
            .await
            .unwrap();

        assert!(report.steps.iter().all(|s| s.change.to != Phase::HelloCheckin));
        assert!(report.steps.iter().all(|s| s.change.to != Phase::Reflection));
        assert_eq!(report.session.current_phase, Phase::Completed);
    }

    #[tokio::test]
    async fn test_second_cycle_restarts_at_round_one() {
        let store = Arc::new(InMemorySessionStore::new());
        let mut two_cycles = settings(3, GroupMode::Single, SessionVariant::Online);
        two_cycles.cycles = 2;
        let report = simulator(store).run(&two_cycles).await.unwrap();

        let completions = report
            .steps
            .iter()
            .filter(|s| s.change.to == Phase::Completion)
            .count();
        assert_eq!(completions, 2);
        assert!(
            report
                .steps
                .iter()
                .any(|s| s.change.from == Phase::Completion && s.change.round == 1)
        );
    }

    #[tokio::test]
    async fn test_multi_group_session_drives_every_group() {
        let store = Arc::new(InMemorySessionStore::new());
        let report = simulator(store)
            .run(&settings(7, GroupMode::Multi, SessionVariant::Online))
            .await
            .unwrap();

        assert_eq!(report.progress.len(), 2);
        assert!(report.progress.iter().all(|p| p.phase == Phase::Completion));
        assert_eq!(report.aggregates.len(), 2);
        assert!(report.aggregates.iter().all(|(_, o)| o.is_complete_success()));
        assert!(
            report
                .session
                .groups
                .iter()
                .all(|g| g.status == GroupStatus::Completed)
        );
        assert_eq!(report.session.status, SessionStatus::Completed);
    }
}
