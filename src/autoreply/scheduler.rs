//! Auto-reply scheduler
//!
//! Background loop that polls every enabled account on its own cooldown,
//! filters unseen messages through the account's conditions and sends the
//! resolved reply back into the originating thread.
//!
//! Failures never stop the loop: a failing account is logged and skipped for
//! the rest of the tick, and a panic escaping a tick is caught and the loop
//! carries on after the next sleep.

use std::any::Any;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;
use tokio::time::Instant;

use super::conditions::should_reply;
use super::config::AccountReplyConfig;
use super::resolver::TemplateResolver;
use crate::channels::DynGateway;

/// Default time between ticks, also the per-account poll cooldown
pub const DEFAULT_TICK_INTERVAL: Duration = Duration::from_secs(60);

/// Scheduler timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSettings {
    /// Sleep between ticks and minimum gap between two polls of one account
    pub tick_interval: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }
}

impl SchedulerSettings {
    /// Settings with the given tick interval
    pub fn with_tick_interval(tick_interval: Duration) -> Self {
        Self { tick_interval }
    }
}

/// What one account produced during a poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountReport {
    /// Unseen messages returned by the gateway
    pub received: usize,
    /// Messages that met the account's conditions
    pub matched: usize,
    /// Replies the gateway accepted
    pub sent: usize,
    /// Matched messages for which no reply text could be resolved
    pub unresolved: usize,
    /// Replies the gateway rejected or failed to send
    pub failed: usize,
}

/// Result of a single account poll attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// Account has no active config
    NotConfigured,
    /// Polled too recently; retry after `remaining`
    CoolingDown { remaining: Duration },
    /// Inbox fetched and processed
    Polled(AccountReport),
    /// Fetching the inbox failed or processing panicked
    Failed(String),
}

/// Summary of one tick across all active accounts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Accounts polled this tick
    pub polled: Vec<String>,
    /// Accounts still cooling down
    pub cooling_down: Vec<String>,
    /// Accounts whose poll failed
    pub failed: Vec<String>,
    /// Replies sent across all accounts
    pub replies_sent: usize,
}

struct SchedulerState {
    settings: SchedulerSettings,
    gateway: DynGateway,
    resolver: TemplateResolver,
    /// Active configs (account_id -> config); disabled accounts are absent
    configs: RwLock<HashMap<String, AccountReplyConfig>>,
    /// Last poll attempt per account (account_id -> instant)
    cursors: Mutex<HashMap<String, Instant>>,
    running: AtomicBool,
    loop_active: AtomicBool,
    wake: Notify,
    /// Ticks finished by the loop since creation
    ticks: AtomicU64,
}

/// Handle to the auto-reply loop.
///
/// Cloning is cheap; all clones share the same state.
#[derive(Clone)]
pub struct AutoReplyScheduler {
    state: Arc<SchedulerState>,
}

impl std::fmt::Debug for AutoReplyScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoReplyScheduler")
            .field("settings", &self.state.settings)
            .field("running", &self.is_running())
            .field("accounts", &self.state.configs.read().len())
            .finish()
    }
}

impl AutoReplyScheduler {
    /// Create a stopped scheduler
    pub fn new(settings: SchedulerSettings, gateway: DynGateway, resolver: TemplateResolver) -> Self {
        Self {
            state: Arc::new(SchedulerState {
                settings,
                gateway,
                resolver,
                configs: RwLock::new(HashMap::new()),
                cursors: Mutex::new(HashMap::new()),
                running: AtomicBool::new(false),
                loop_active: AtomicBool::new(false),
                wake: Notify::new(),
                ticks: AtomicU64::new(0),
            }),
        }
    }

    /// Scheduler timing
    pub fn settings(&self) -> SchedulerSettings {
        self.state.settings
    }

    /// Resolver used for replies
    pub fn resolver(&self) -> &TemplateResolver {
        &self.state.resolver
    }

    /// Start the background loop.
    ///
    /// Returns `true` when a new loop task was spawned, `false` when one was
    /// already alive. Must be called from within a tokio runtime.
    pub fn start(&self) -> bool {
        self.state.running.store(true, Ordering::SeqCst);
        if self.state.loop_active.swap(true, Ordering::SeqCst) {
            tracing::debug!("auto-reply loop already active");
            return false;
        }

        let scheduler = self.clone();
        tokio::spawn(async move { scheduler.run_loop().await });
        true
    }

    /// Ask the loop to stop after the work in flight
    pub fn stop(&self) {
        if self.state.running.swap(false, Ordering::SeqCst) {
            tracing::info!("auto-reply loop stopping");
        }
        // Wakes only a loop that is waiting; no permit is left behind for a
        // later start() to consume.
        self.state.wake.notify_waiters();
    }

    /// Whether the loop has been started and not stopped
    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }

    /// Whether a loop task is currently alive
    pub fn is_loop_active(&self) -> bool {
        self.state.loop_active.load(Ordering::SeqCst)
    }

    /// Ticks run by the background loop so far
    pub fn ticks_completed(&self) -> u64 {
        self.state.ticks.load(Ordering::SeqCst)
    }

    /// Replace or remove the config for `account_id`.
    ///
    /// Enabled configs are inserted (replacing any previous one). Disabled
    /// configs remove the account and its poll cursor; removing an unknown
    /// account is a no-op.
    pub fn update_config(&self, account_id: &str, mut config: AccountReplyConfig) {
        config.account_id = account_id.to_string();

        if config.enabled {
            tracing::info!(
                account = %account_id,
                template = config.template_ref.as_deref().unwrap_or("-"),
                conditions = config.conditions.len(),
                "auto-reply enabled"
            );
            self.state.configs.write().insert(account_id.to_string(), config);
        } else {
            let removed = self.state.configs.write().remove(account_id).is_some();
            self.state.cursors.lock().remove(account_id);
            if removed {
                tracing::info!(account = %account_id, "auto-reply disabled");
            }
        }
    }

    /// Active configs ordered by account id
    pub fn active_configs(&self) -> Vec<AccountReplyConfig> {
        let mut configs: Vec<_> = self.state.configs.read().values().cloned().collect();
        configs.sort_by(|a, b| a.account_id.cmp(&b.account_id));
        configs
    }

    /// Active config for one account
    pub fn config(&self, account_id: &str) -> Option<AccountReplyConfig> {
        self.state.configs.read().get(account_id).cloned()
    }

    /// Poll one account if its cooldown has elapsed.
    pub async fn poll_account(&self, account_id: &str) -> PollOutcome {
        match self.config(account_id) {
            Some(config) => self.process_account(config).await,
            None => PollOutcome::NotConfigured,
        }
    }

    /// Run one pass over every active account.
    ///
    /// Accounts are processed concurrently; messages within an account keep
    /// gateway order.
    pub async fn run_tick(&self) -> TickReport {
        let configs = self.active_configs();

        let outcomes = join_all(configs.into_iter().map(|config| async move {
            let account_id = config.account_id.clone();
            let outcome = AssertUnwindSafe(self.process_account(config))
                .catch_unwind()
                .await
                .unwrap_or_else(|panic| {
                    let reason = panic_message(panic.as_ref());
                    tracing::error!(account = %account_id, panic = %reason, "account poll panicked");
                    PollOutcome::Failed(format!("panicked: {reason}"))
                });
            (account_id, outcome)
        }))
        .await;

        let mut report = TickReport::default();
        for (account_id, outcome) in outcomes {
            match outcome {
                PollOutcome::Polled(account) => {
                    report.replies_sent += account.sent;
                    report.polled.push(account_id);
                }
                PollOutcome::CoolingDown { .. } => report.cooling_down.push(account_id),
                PollOutcome::Failed(_) => report.failed.push(account_id),
                PollOutcome::NotConfigured => {}
            }
        }

        tracing::debug!(
            polled = report.polled.len(),
            cooling_down = report.cooling_down.len(),
            failed = report.failed.len(),
            replies = report.replies_sent,
            "auto-reply tick finished"
        );
        report
    }

    /// Claim a poll slot for `account_id`, recording the attempt time.
    fn claim_poll(&self, account_id: &str) -> Result<(), Duration> {
        let now = Instant::now();
        let cooldown = self.state.settings.tick_interval;

        let mut cursors = self.state.cursors.lock();
        if let Some(last) = cursors.get(account_id) {
            let elapsed = now.saturating_duration_since(*last);
            if elapsed < cooldown {
                return Err(cooldown - elapsed);
            }
        }
        cursors.insert(account_id.to_string(), now);
        Ok(())
    }

    async fn process_account(&self, config: AccountReplyConfig) -> PollOutcome {
        let account_id = config.account_id.as_str();

        // Removed since the tick snapshot was taken
        if !self.state.configs.read().contains_key(account_id) {
            return PollOutcome::NotConfigured;
        }

        if let Err(remaining) = self.claim_poll(account_id) {
            tracing::trace!(
                account = %account_id,
                remaining_secs = remaining.as_secs(),
                "account cooling down"
            );
            return PollOutcome::CoolingDown { remaining };
        }

        let messages = match self.state.gateway.poll_unseen(account_id).await {
            Ok(messages) => messages,
            Err(e) => {
                tracing::warn!(account = %account_id, error = %e, "failed to poll inbox");
                return PollOutcome::Failed(e.to_string());
            }
        };

        let mut report = AccountReport {
            received: messages.len(),
            ..AccountReport::default()
        };

        for message in &messages {
            if !should_reply(&message.text, &config.conditions) {
                continue;
            }
            report.matched += 1;

            let Some(reply) = self
                .state
                .resolver
                .resolve_reply(config.template_ref.as_deref(), &message.text)
                .await
            else {
                report.unresolved += 1;
                continue;
            };

            match self
                .state
                .gateway
                .send_reply(account_id, &message.thread_id, &reply)
                .await
            {
                Ok(delivery) if delivery.ok => {
                    report.sent += 1;
                    tracing::info!(
                        account = %account_id,
                        thread = %message.thread_id,
                        sender = %message.sender_id,
                        "auto-reply sent"
                    );
                }
                Ok(delivery) => {
                    report.failed += 1;
                    tracing::warn!(
                        account = %account_id,
                        thread = %message.thread_id,
                        error = delivery.error.as_deref().unwrap_or("unknown"),
                        "auto-reply rejected"
                    );
                }
                Err(e) => {
                    report.failed += 1;
                    tracing::warn!(
                        account = %account_id,
                        thread = %message.thread_id,
                        error = %e,
                        "failed to send auto-reply"
                    );
                }
            }
        }

        if report.received > 0 {
            tracing::debug!(
                account = %account_id,
                received = report.received,
                matched = report.matched,
                sent = report.sent,
                "account processed"
            );
        }

        PollOutcome::Polled(report)
    }

    async fn run_loop(self) {
        tracing::info!(
            tick_secs = self.state.settings.tick_interval.as_secs(),
            "auto-reply loop started"
        );

        loop {
            while self.is_running() {
                if let Err(panic) = AssertUnwindSafe(self.run_tick()).catch_unwind().await {
                    tracing::error!(
                        panic = %panic_message(panic.as_ref()),
                        "auto-reply tick panicked"
                    );
                }
                self.state.ticks.fetch_add(1, Ordering::SeqCst);

                // Register for the wake-up before checking the flag so a
                // stop() landing in between is not missed.
                let wake = self.state.wake.notified();
                tokio::pin!(wake);
                wake.as_mut().enable();

                if !self.is_running() {
                    break;
                }

                tokio::select! {
                    _ = tokio::time::sleep(self.state.settings.tick_interval) => {}
                    _ = &mut wake => {}
                }
            }

            self.state.loop_active.store(false, Ordering::SeqCst);

            // A start() racing with this exit saw the loop as active and did
            // not spawn; pick the work back up here.
            if !self.is_running() || self.state.loop_active.swap(true, Ordering::SeqCst) {
                break;
            }
        }

        tracing::info!("auto-reply loop stopped");
    }
}

pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{GenerationContext, IntentAnalysis, ResponseGenerator};
    use crate::autoreply::config::ConditionKind;
    use crate::channels::{
        ChannelError, ChannelResult, DeliveryResult, InboundMessage, MessagingGateway,
    };
    use crate::templates::{MemoryTemplateStore, TemplateStore};
    use async_trait::async_trait;
    use std::collections::HashSet;

    #[derive(Default)]
    struct FakeGateway {
        inbox: Mutex<HashMap<String, Vec<InboundMessage>>>,
        polls: Mutex<Vec<String>>,
        sent: Mutex<Vec<(String, String, String)>>,
        failing: HashSet<String>,
        panicking: HashSet<String>,
    }

    impl FakeGateway {
        fn deliver(&self, account: &str, thread: &str, text: &str) {
            self.inbox
                .lock()
                .entry(account.to_string())
                .or_default()
                .push(InboundMessage::new(thread, "customer", text));
        }

        fn poll_count(&self, account: &str) -> usize {
            self.polls.lock().iter().filter(|a| *a == account).count()
        }

        fn sent(&self) -> Vec<(String, String, String)> {
            self.sent.lock().clone()
        }
    }

    #[async_trait]
    impl MessagingGateway for FakeGateway {
        async fn poll_unseen(&self, account_id: &str) -> ChannelResult<Vec<InboundMessage>> {
            self.polls.lock().push(account_id.to_string());
            if self.panicking.contains(account_id) {
                panic!("session exploded");
            }
            if self.failing.contains(account_id) {
                return Err(ChannelError::NotConnected(account_id.to_string()));
            }
            Ok(self.inbox.lock().remove(account_id).unwrap_or_default())
        }

        async fn send_reply(
            &self,
            account_id: &str,
            thread_id: &str,
            text: &str,
        ) -> ChannelResult<DeliveryResult> {
            self.sent
                .lock()
                .push((account_id.to_string(), thread_id.to_string(), text.to_string()));
            Ok(DeliveryResult::delivered(None))
        }

        async fn send_dm(
            &self,
            _account_id: &str,
            _recipient: &str,
            _text: &str,
        ) -> ChannelResult<DeliveryResult> {
            Ok(DeliveryResult::rejected("direct messages are not used here"))
        }
    }

    struct EchoGenerator;

    #[async_trait]
    impl ResponseGenerator for EchoGenerator {
        async fn analyze_intent(&self, _text: &str) -> crate::ai::Result<Option<IntentAnalysis>> {
            Ok(None)
        }

        async fn generate(
            &self,
            text: &str,
            context: &GenerationContext,
        ) -> crate::ai::Result<Option<String>> {
            Ok(Some(format!(
                "[{}] re: {}",
                context.template_guide.as_deref().unwrap_or(""),
                text
            )))
        }
    }

    fn templates() -> Arc<dyn TemplateStore> {
        Arc::new(
            MemoryTemplateStore::new()
                .with_template("T1", "Thanks for asking!")
                .with_template("AI1", "AI:be concise"),
        )
    }

    fn scheduler(gateway: Arc<FakeGateway>) -> AutoReplyScheduler {
        AutoReplyScheduler::new(
            SchedulerSettings::default(),
            gateway,
            TemplateResolver::new(templates()),
        )
    }

    fn enabled(template: &str) -> AccountReplyConfig {
        AccountReplyConfig::new("").with_template(template)
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_allows_one_poll_per_interval() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("T1"));

        assert!(matches!(scheduler.poll_account("shop").await, PollOutcome::Polled(_)));
        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(matches!(
            scheduler.poll_account("shop").await,
            PollOutcome::CoolingDown { remaining } if remaining == Duration::from_secs(50)
        ));
        assert_eq!(gateway.poll_count("shop"), 1);

        tokio::time::advance(Duration::from_secs(50)).await;
        assert!(matches!(scheduler.poll_account("shop").await, PollOutcome::Polled(_)));
        assert_eq!(gateway.poll_count("shop"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unconfigured_account_never_polled() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = scheduler(gateway.clone());

        assert_eq!(scheduler.poll_account("ghost").await, PollOutcome::NotConfigured);
        assert_eq!(scheduler.run_tick().await, TickReport::default());
        assert!(gateway.polls.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_account_removed_from_polling() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("T1"));
        scheduler.run_tick().await;
        assert_eq!(gateway.poll_count("shop"), 1);

        scheduler.update_config("shop", AccountReplyConfig::disabled("shop"));
        assert!(scheduler.active_configs().is_empty());
        assert!(scheduler.state.cursors.lock().is_empty());

        tokio::time::advance(Duration::from_secs(61)).await;
        scheduler.run_tick().await;
        assert_eq!(gateway.poll_count("shop"), 1);

        // Removing again is a no-op.
        scheduler.update_config("shop", AccountReplyConfig::disabled("shop"));
        assert!(scheduler.active_configs().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_update_replaces_whole_config() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = scheduler(gateway);
        scheduler.update_config(
            "shop",
            enabled("T1").with_condition(ConditionKind::Contains, "price"),
        );
        scheduler.update_config("shop", enabled("AI1"));

        let config = scheduler.config("shop").unwrap();
        assert_eq!(config.account_id, "shop");
        assert_eq!(config.template_ref.as_deref(), Some("AI1"));
        assert!(config.conditions.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_account_does_not_block_others() {
        let gateway = Arc::new(FakeGateway {
            failing: HashSet::from(["broken".to_string()]),
            panicking: HashSet::from(["cursed".to_string()]),
            ..FakeGateway::default()
        });
        gateway.deliver("healthy", "th-1", "hello");

        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("broken", enabled("T1"));
        scheduler.update_config("cursed", enabled("T1"));
        scheduler.update_config("healthy", enabled("T1"));

        let report = scheduler.run_tick().await;
        assert_eq!(report.polled, vec!["healthy"]);
        assert_eq!(report.failed, vec!["broken", "cursed"]);
        assert_eq!(report.replies_sent, 1);
        assert_eq!(gateway.poll_count("healthy"), 1);

        // Failed polls still consume the cooldown.
        let report = scheduler.run_tick().await;
        assert_eq!(report.cooling_down, vec!["broken", "cursed", "healthy"]);
        assert_eq!(gateway.poll_count("broken"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_conditions_gate_replies_in_order() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.deliver("shop", "th-1", "What time do you open?");
        gateway.deliver("shop", "th-2", "Great store!");
        gateway.deliver("shop", "th-3", "Do you ship abroad?");

        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("T1").with_condition(ConditionKind::EndsWith, "?"));

        match scheduler.poll_account("shop").await {
            PollOutcome::Polled(report) => {
                assert_eq!(report.received, 3);
                assert_eq!(report.matched, 2);
                assert_eq!(report.sent, 2);
            }
            other => panic!("unexpected outcome {other:?}"),
        }

        let threads: Vec<_> = gateway.sent().into_iter().map(|(_, t, _)| t).collect();
        assert_eq!(threads, vec!["th-1", "th-3"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_template_sends_nothing() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.deliver("shop", "th-1", "hi");
        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("deleted"));

        match scheduler.poll_account("shop").await {
            PollOutcome::Polled(report) => assert_eq!(report.unresolved, 1),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert!(gateway.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_template_falls_back_to_raw_content() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.deliver("shop", "th-1", "Open today?");
        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("AI1"));

        scheduler.run_tick().await;
        assert_eq!(
            gateway.sent(),
            vec![("shop".to_string(), "th-1".to_string(), "AI:be concise".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_ai_template_uses_generator() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.deliver("shop", "th-1", "Open today?");
        let resolver = TemplateResolver::new(templates())
            .with_generator(Some(Arc::new(EchoGenerator) as Arc<dyn ResponseGenerator>));
        let scheduler = AutoReplyScheduler::new(SchedulerSettings::default(), gateway.clone(), resolver);
        scheduler.update_config("shop", enabled("AI1"));

        scheduler.run_tick().await;
        assert_eq!(gateway.sent()[0].2, "[be concise] re: Open today?");
    }

    #[tokio::test(start_paused = true)]
    async fn test_loop_start_stop() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("T1"));

        assert!(scheduler.start());
        assert!(!scheduler.start(), "second start must not spawn another loop");
        assert!(scheduler.is_running());

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.poll_count("shop"), 1);

        // Account added mid-cycle is picked up on the next tick.
        scheduler.update_config("late", enabled("T1"));
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(gateway.poll_count("shop"), 2);
        assert_eq!(gateway.poll_count("late"), 1);

        scheduler.stop();
        assert!(!scheduler.is_running());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!scheduler.is_loop_active());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(gateway.poll_count("shop"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_after_stop() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("T1"));

        assert!(scheduler.start());
        tokio::time::sleep(Duration::from_secs(1)).await;
        scheduler.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!scheduler.is_loop_active());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(scheduler.start());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(gateway.poll_count("shop"), 2);
        scheduler.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_after_stop_waits_full_interval() {
        let gateway = Arc::new(FakeGateway::default());
        let scheduler = scheduler(gateway.clone());
        scheduler.update_config("shop", enabled("T1"));

        // A stop with no loop alive must not shorten the next loop's sleep.
        scheduler.stop();
        assert!(scheduler.start());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.ticks_completed(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(scheduler.ticks_completed(), 1);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(scheduler.ticks_completed(), 2);

        // Same after a stop that lands while the loop is alive.
        scheduler.stop();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(!scheduler.is_loop_active());
        assert!(scheduler.start());
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(scheduler.ticks_completed(), 3);
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(scheduler.ticks_completed(), 3);
        scheduler.stop();
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(boxed.as_ref()), "static");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(42);
        assert_eq!(panic_message(boxed.as_ref()), "unknown panic");
    }
}
