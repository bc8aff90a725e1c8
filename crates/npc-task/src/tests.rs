//! Unit tests for npc-task.

#[cfg(test)]
mod support {
    use std::sync::atomic::{AtomicI64, Ordering};
    use std::sync::{Arc, Mutex};

    use rustc_hash::FxHashSet;

    use npc_core::{AgentId, NativeTaskId, TaskId, Tick};

    use crate::{
        Task, TaskClass, TaskCore, TaskCx, TaskEnv, TaskError, TaskObserver, TaskResult,
        TimeoutSupervisor,
    };

    pub const AGENT: AgentId = AgentId(1);

    #[derive(Default)]
    pub struct TestEnv {
        pub now:    Tick,
        pub native: FxHashSet<(AgentId, NativeTaskId)>,
    }

    impl TaskEnv for TestEnv {
        fn now(&self) -> Tick {
            self.now
        }

        fn native_task_running(&self, agent: AgentId, task: NativeTaskId) -> bool {
            self.native.contains(&(agent, task))
        }
    }

    pub type Log = Arc<Mutex<Vec<String>>>;

    /// Decrements the shared counter when dropped.
    pub struct Held(Arc<AtomicI64>);

    impl Held {
        pub fn acquire(counter: &Arc<AtomicI64>) -> Self {
            counter.fetch_add(1, Ordering::SeqCst);
            Held(Arc::clone(counter))
        }
    }

    impl Drop for Held {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// What a [`LoggedTask`] does on its next `on_process`.
    #[derive(Clone, Copy, Debug)]
    pub enum Then {
        Nothing,
        Fail,
        Stale,
        AbortSelf,
        ClearSubs,
        Spawn(TaskClass),
    }

    /// Logs every hook and optionally holds a counter.
    pub struct LoggedTask {
        pub core:     TaskCore,
        pub log:      Log,
        pub counter:  Option<Arc<AtomicI64>>,
        pub held:     Option<Held>,
        pub then:     Then,
        pub aborts:   Arc<AtomicI64>,
    }

    impl LoggedTask {
        pub fn new(id: u16, name: &'static str, log: &Log) -> Self {
            Self {
                core:    TaskCore::new(TaskId(id), name),
                log:     Arc::clone(log),
                counter: None,
                held:    None,
                then:    Then::Nothing,
                aborts:  Arc::new(AtomicI64::new(0)),
            }
        }

        pub fn then(mut self, then: Then) -> Self {
            self.then = then;
            self
        }

        pub fn holding(mut self, counter: &Arc<AtomicI64>) -> Self {
            self.counter = Some(Arc::clone(counter));
            self
        }

        pub fn timeout(mut self, t: TimeoutSupervisor) -> Self {
            self.core = self.core.with_timeout(t);
            self
        }

        fn note(&self, what: &str) {
            self.log.lock().unwrap().push(format!("{}:{}", self.core.name(), what));
        }
    }

    impl Task<TestEnv> for LoggedTask {
        fn core(&self) -> &TaskCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut TaskCore {
            &mut self.core
        }

        fn on_initialize(&mut self, _cx: &mut TaskCx<'_, TestEnv>) {
            self.held = self.counter.as_ref().map(Held::acquire);
            self.note("init");
        }

        fn on_process(&mut self, cx: &mut TaskCx<'_, TestEnv>) -> TaskResult<()> {
            self.note("process");
            let then = std::mem::replace(&mut self.then, Then::Nothing);
            match then {
                Then::Nothing => {}
                Then::Fail => return Err(TaskError::Failed("boom".into())),
                Then::Stale => return Err(TaskError::StaleReference("target")),
                Then::AbortSelf => self.make_abortable(cx),
                Then::ClearSubs => cx.clear_sub_tasks(),
                Then::Spawn(class) => {
                    let child = LoggedTask::new(99, "child", &self.log);
                    cx.assign(Box::new(child), class);
                }
            }
            Ok(())
        }

        fn on_abort(&mut self, _cx: &mut TaskCx<'_, TestEnv>) {
            self.held = None;
            self.aborts.fetch_add(1, Ordering::SeqCst);
            self.note("abort");
        }

        fn on_timeout(&mut self, _cx: &mut TaskCx<'_, TestEnv>) {
            self.note("timeout");
        }
    }

    #[derive(Clone, Default)]
    pub struct RecordingObserver {
        pub events: Arc<Mutex<Vec<String>>>,
    }

    impl TaskObserver for RecordingObserver {
        fn on_task_assigned(&mut self, _agent: AgentId, task: TaskId, name: &'static str, class: TaskClass) {
            self.events.lock().unwrap().push(format!("assigned {name} {} {class:?}", task.0));
        }

        fn on_task_aborted(&mut self, _agent: AgentId, _task: TaskId, name: &'static str) {
            self.events.lock().unwrap().push(format!("aborted {name}"));
        }
    }

    pub fn new_log() -> Log {
        Arc::new(Mutex::new(Vec::new()))
    }

    pub fn entries(log: &Log) -> Vec<String> {
        log.lock().unwrap().clone()
    }
}

// ── TimeoutSupervisor ─────────────────────────────────────────────────────────

#[cfg(test)]
mod timeout {
    use npc_core::{SimClock, Tick};

    use crate::{TimeoutMode, TimeoutSupervisor};

    #[test]
    fn repeating_expires_at_duration_and_stays_expired() {
        let mut t = TimeoutSupervisor::new(10);
        t.reset(Tick(5));
        assert!(!t.expired(Tick(14)));
        assert!(t.expired(Tick(15)));
        assert!(t.expired(Tick(16)));
        assert!(t.expired(Tick(100)));
    }

    #[test]
    fn one_shot_fires_once_until_reset() {
        let mut t = TimeoutSupervisor::one_shot(3);
        assert_eq!(t.mode(), TimeoutMode::OneShot);
        t.reset(Tick(0));
        assert!(t.expired(Tick(3)));
        assert!(!t.expired(Tick(4)));
        assert!(!t.expired(Tick(50)));

        t.reset(Tick(50));
        assert!(!t.expired(Tick(52)));
        assert!(t.expired(Tick(53)));
    }

    #[test]
    fn disabled_never_expires() {
        let mut t = TimeoutSupervisor::disabled();
        t.reset(Tick(0));
        assert!(!t.expired(Tick(u64::MAX)));
        assert_eq!(t.remaining(Tick(10)), None);
    }

    #[test]
    fn from_millis_rounds_up_to_whole_ticks() {
        let clock = SimClock::new(50);
        assert_eq!(TimeoutSupervisor::from_millis(250, &clock).duration(), Some(5));
        assert_eq!(TimeoutSupervisor::from_millis(120, &clock).duration(), Some(3));
    }

    #[test]
    fn ready_throttles_and_restarts() {
        let mut t = TimeoutSupervisor::new(5);
        t.reset(Tick(0));
        t.expire_now();
        assert!(t.ready(Tick(0)));
        assert!(!t.ready(Tick(4)));
        assert!(t.ready(Tick(5)));
        assert!(!t.ready(Tick(9)));
        assert!(t.ready(Tick(10)));
    }

    #[test]
    fn remaining_counts_down() {
        let mut t = TimeoutSupervisor::new(20);
        t.reset(Tick(10));
        assert_eq!(t.remaining(Tick(15)), Some(15));
        assert_eq!(t.remaining(Tick(40)), Some(0));
    }
}

// ── TaskScheduler ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod scheduler {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicI64, Ordering};

    use npc_core::{NativeTaskId, TaskId, Tick};

    use super::support::*;
    use crate::{TaskClass, TaskScheduler, TimeoutSupervisor};

    #[test]
    fn assign_initializes_synchronously_and_notifies() {
        let log = new_log();
        let observer = RecordingObserver::default();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.add_observer(Box::new(observer.clone()));

        s.assign(Box::new(LoggedTask::new(1, "a", &log)), TaskClass::Main, AGENT, &mut env);

        assert_eq!(entries(&log), vec!["a:init"]);
        assert!(s.is_task_active(TaskId(1)));
        assert_eq!(s.stats().assigned, 1);
        assert_eq!(observer.events.lock().unwrap().as_slice(), ["assigned a 1 Main"]);
    }

    #[test]
    fn main_runs_before_sub() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.assign(Box::new(LoggedTask::new(2, "sub", &log)), TaskClass::Sub, AGENT, &mut env);
        s.assign(Box::new(LoggedTask::new(1, "main", &log)), TaskClass::Main, AGENT, &mut env);
        log.lock().unwrap().clear();

        s.process(AGENT, &mut env);
        assert_eq!(entries(&log), vec!["main:process", "sub:process"]);
    }

    #[test]
    fn task_assigned_mid_pass_runs_in_same_pass() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        let parent = LoggedTask::new(1, "parent", &log).then(Then::Spawn(TaskClass::Sub));
        s.assign(Box::new(parent), TaskClass::Main, AGENT, &mut env);
        log.lock().unwrap().clear();

        s.process(AGENT, &mut env);
        assert_eq!(entries(&log), vec!["parent:process", "child:init", "child:process"]);
        assert_eq!(s.sub_len(), 1);
    }

    #[test]
    fn failure_is_isolated() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.assign(Box::new(LoggedTask::new(1, "bad", &log).then(Then::Fail)), TaskClass::Sub, AGENT, &mut env);
        s.assign(Box::new(LoggedTask::new(2, "good", &log)), TaskClass::Sub, AGENT, &mut env);

        s.process(AGENT, &mut env);
        assert!(!s.is_task_active(TaskId(1)));
        assert!(s.is_task_active(TaskId(2)));
        assert_eq!(s.sub_len(), 1);
        assert_eq!(s.stats().failed, 1);

        // The survivor keeps running on later ticks.
        log.lock().unwrap().clear();
        s.process(AGENT, &mut env);
        assert_eq!(entries(&log), vec!["good:process"]);
    }

    #[test]
    fn stale_reference_retires_without_counting_as_failure() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.assign(Box::new(LoggedTask::new(1, "t", &log).then(Then::Stale)), TaskClass::Main, AGENT, &mut env);
        s.process(AGENT, &mut env);
        assert!(s.is_empty());
        assert_eq!(s.stats().failed, 0);
        assert_eq!(s.stats().aborted, 1);
    }

    #[test]
    fn clears_spare_permanent_tasks_but_shutdown_does_not() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.assign(Box::new(LoggedTask::new(1, "main", &log)), TaskClass::Main, AGENT, &mut env);
        s.assign(Box::new(LoggedTask::new(2, "sub", &log)), TaskClass::Sub, AGENT, &mut env);
        s.assign(Box::new(LoggedTask::new(3, "perm", &log)), TaskClass::Permanent, AGENT, &mut env);

        s.clear_sub_tasks(AGENT, &mut env);
        assert_eq!(s.active_ids(), vec![TaskId(1), TaskId(3)]);

        s.clear_tasks(AGENT, &mut env);
        assert_eq!(s.active_ids(), vec![TaskId(3)]);
        assert_eq!((s.main_len(), s.sub_len()), (0, 1));

        s.shutdown(AGENT, &mut env);
        assert!(s.is_empty());
        assert!(entries(&log).contains(&"perm:abort".to_string()));
    }

    #[test]
    fn clear_main_task_leaves_subs() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.assign(Box::new(LoggedTask::new(1, "main", &log)), TaskClass::Main, AGENT, &mut env);
        s.assign(Box::new(LoggedTask::new(2, "sub", &log)), TaskClass::Sub, AGENT, &mut env);
        s.clear_main_task(AGENT, &mut env);
        assert_eq!(s.active_ids(), vec![TaskId(2)]);
    }

    #[test]
    fn task_clearing_its_own_list_is_aborted_once_after_its_hook() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        let task = LoggedTask::new(1, "clearer", &log).then(Then::ClearSubs);
        let aborts = Arc::clone(&task.aborts);
        s.assign(Box::new(LoggedTask::new(2, "sibling", &log)), TaskClass::Sub, AGENT, &mut env);
        s.assign(Box::new(task), TaskClass::Sub, AGENT, &mut env);
        log.lock().unwrap().clear();

        s.process(AGENT, &mut env);

        // The sibling was already processed this pass, then aborted by the clear.
        assert_eq!(entries(&log), vec![
            "sibling:process",
            "clearer:process",
            "sibling:abort",
            "clearer:abort",
        ]);
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
        assert!(s.is_empty());
    }

    #[test]
    fn abort_task_is_idempotent_and_releases_counter_once() {
        let log = new_log();
        let counter = Arc::new(AtomicI64::new(0));
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();

        for _ in 0..5 {
            let task = LoggedTask::new(7, "holder", &log).holding(&counter);
            let aborts = Arc::clone(&task.aborts);
            s.assign(Box::new(task), TaskClass::Sub, AGENT, &mut env);
            assert_eq!(counter.load(Ordering::SeqCst), 1);

            assert!(s.abort_task(TaskId(7), AGENT, &mut env));
            assert!(!s.abort_task(TaskId(7), AGENT, &mut env));
            assert_eq!(counter.load(Ordering::SeqCst), 0);
            assert_eq!(aborts.load(Ordering::SeqCst), 1);
        }
        assert!(s.is_empty());
    }

    #[test]
    fn deadline_forces_abort_exactly_at_expiry() {
        let log = new_log();
        let counter = Arc::new(AtomicI64::new(0));
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();

        let task = LoggedTask::new(5, "stuck", &log)
            .holding(&counter)
            .timeout(TimeoutSupervisor::new(20_000));
        let aborts = Arc::clone(&task.aborts);
        s.assign(Box::new(task), TaskClass::Main, AGENT, &mut env);

        for tick in 0..20_000 {
            env.now = Tick(tick);
            s.process(AGENT, &mut env);
            assert!(s.is_task_active(TaskId(5)), "aborted early at tick {tick}");
        }
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        env.now = Tick(20_000);
        s.process(AGENT, &mut env);
        assert!(!s.is_task_active(TaskId(5)));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert_eq!(aborts.load(Ordering::SeqCst), 1);
        assert_eq!(s.stats().timed_out, 1);

        let tail: Vec<String> = entries(&log).into_iter().rev().take(2).collect();
        assert_eq!(tail, vec!["stuck:abort", "stuck:timeout"]);
    }

    #[test]
    fn dropping_the_scheduler_releases_held_counters() {
        let log = new_log();
        let counter = Arc::new(AtomicI64::new(0));
        let mut env = TestEnv::default();
        {
            let mut s = TaskScheduler::new();
            s.assign(Box::new(LoggedTask::new(1, "h", &log).holding(&counter)), TaskClass::Sub, AGENT, &mut env);
            assert_eq!(counter.load(Ordering::SeqCst), 1);
        }
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn lookups() {
        let log = new_log();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.assign(Box::new(LoggedTask::new(4, "x", &log)), TaskClass::Sub, AGENT, &mut env);

        assert_eq!(s.find_task_with_id(TaskId(4)).map(|t| t.name()), Some("x"));
        assert!(s.find_task_with_id(TaskId(5)).is_none());

        let native = NativeTaskId(3);
        assert!(!s.is_internal_task_active(AGENT, native, &env));
        env.native.insert((AGENT, native));
        assert!(s.is_internal_task_active(AGENT, native, &env));
    }

    #[test]
    fn observer_sees_aborts() {
        let log = new_log();
        let observer = RecordingObserver::default();
        let mut env = TestEnv::default();
        let mut s = TaskScheduler::new();
        s.add_observer(Box::new(observer.clone()));
        s.assign(Box::new(LoggedTask::new(1, "a", &log).then(Then::AbortSelf)), TaskClass::Sub, AGENT, &mut env);
        s.process(AGENT, &mut env);
        assert_eq!(observer.events.lock().unwrap().last().map(String::as_str), Some("aborted a"));
    }
}

// ── Property: sweep safety ────────────────────────────────────────────────────

#[cfg(test)]
mod sweep_safety {
    use std::sync::{Arc, Mutex};

    use proptest::prelude::*;

    use npc_core::{TaskId, Tick};

    use super::support::{AGENT, TestEnv};
    use crate::{Task, TaskClass, TaskCore, TaskCx, TaskError, TaskResult, TaskScheduler};

    #[derive(Clone, Copy, Debug)]
    enum Op {
        Idle,
        SpawnMain,
        SpawnSub,
        AbortSelf,
        ClearSubs,
        ClearMain,
        AbortId(u16),
        Fail,
    }

    #[derive(Default)]
    struct Record {
        inits:     u32,
        aborts:    u32,
        processed: u32,
        active:    bool,
    }

    #[derive(Default)]
    struct Tracker {
        records: Vec<Record>,
    }

    type Shared = Arc<Mutex<Tracker>>;

    struct Scripted {
        core:            TaskCore,
        instance:        usize,
        ops:             Vec<Op>,
        step:            usize,
        spawn_on_abort:  bool,
        tracker:         Shared,
    }

    impl Scripted {
        fn new(tracker: &Shared, id: u16, ops: Vec<Op>, spawn_on_abort: bool) -> Self {
            let instance = {
                let mut t = tracker.lock().unwrap();
                t.records.push(Record::default());
                t.records.len() - 1
            };
            Self {
                core: TaskCore::new(TaskId(id), "scripted"),
                instance,
                ops,
                step: 0,
                spawn_on_abort,
                tracker: Arc::clone(tracker),
            }
        }
    }

    impl Task<TestEnv> for Scripted {
        fn core(&self) -> &TaskCore {
            &self.core
        }

        fn core_mut(&mut self) -> &mut TaskCore {
            &mut self.core
        }

        fn on_initialize(&mut self, _cx: &mut TaskCx<'_, TestEnv>) {
            let mut t = self.tracker.lock().unwrap();
            let r = &mut t.records[self.instance];
            r.inits += 1;
            r.active = true;
        }

        fn on_process(&mut self, cx: &mut TaskCx<'_, TestEnv>) -> TaskResult<()> {
            self.tracker.lock().unwrap().records[self.instance].processed += 1;
            let op = self.ops.get(self.step).copied().unwrap_or(Op::Idle);
            self.step += 1;
            match op {
                Op::Idle => {}
                Op::SpawnMain => {
                    let child = Scripted::new(&self.tracker, 9, Vec::new(), false);
                    cx.assign(Box::new(child), TaskClass::Main);
                }
                Op::SpawnSub => {
                    let child = Scripted::new(&self.tracker, 9, Vec::new(), false);
                    cx.assign(Box::new(child), TaskClass::Sub);
                }
                Op::AbortSelf => self.make_abortable(cx),
                Op::ClearSubs => cx.clear_sub_tasks(),
                Op::ClearMain => cx.clear_main_task(),
                Op::AbortId(id) => {
                    cx.abort_task(TaskId(id));
                }
                Op::Fail => return Err(TaskError::Failed("scripted".into())),
            }
            Ok(())
        }

        fn on_abort(&mut self, cx: &mut TaskCx<'_, TestEnv>) {
            {
                let mut t = self.tracker.lock().unwrap();
                let r = &mut t.records[self.instance];
                r.aborts += 1;
                r.active = false;
            }
            if self.spawn_on_abort {
                let child = Scripted::new(&self.tracker, 8, Vec::new(), false);
                cx.assign(Box::new(child), TaskClass::Sub);
            }
        }
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => Just(Op::Idle),
            1 => Just(Op::SpawnMain),
            2 => Just(Op::SpawnSub),
            2 => Just(Op::AbortSelf),
            1 => Just(Op::ClearSubs),
            1 => Just(Op::ClearMain),
            2 => (0u16..4).prop_map(Op::AbortId),
            1 => Just(Op::Fail),
        ]
    }

    fn class() -> impl Strategy<Value = TaskClass> {
        prop_oneof![Just(TaskClass::Main), Just(TaskClass::Sub), Just(TaskClass::Permanent)]
    }

    fn seed() -> impl Strategy<Value = (TaskClass, u16, Vec<Op>, bool)> {
        (class(), 0u16..4, prop::collection::vec(op(), 0..6), any::<bool>())
    }

    proptest! {
        #[test]
        fn random_assign_abort_interleavings_keep_lists_consistent(
            seeds  in prop::collection::vec(seed(), 1..7),
            passes in 1u64..8,
        ) {
            let tracker: Shared = Arc::new(Mutex::new(Tracker::default()));
            let mut env = TestEnv::default();
            let mut s = TaskScheduler::new();

            for (class, id, ops, spawn_on_abort) in seeds {
                let task = Scripted::new(&tracker, id, ops, spawn_on_abort);
                s.assign(Box::new(task), class, AGENT, &mut env);
            }

            for pass in 0..passes {
                env.now = Tick(pass);
                let before: Vec<(bool, u32)> = tracker
                    .lock()
                    .unwrap()
                    .records
                    .iter()
                    .map(|r| (r.active, r.processed))
                    .collect();

                s.process(AGENT, &mut env);

                let t = tracker.lock().unwrap();
                for (i, r) in t.records.iter().enumerate() {
                    let (was_active, processed_before) = before.get(i).copied().unwrap_or((false, 0));
                    let ran = r.processed - processed_before;
                    prop_assert!(ran <= 1, "instance {} processed {} times in one pass", i, ran);
                    if was_active && r.active {
                        prop_assert_eq!(ran, 1, "instance {} skipped while active", i);
                    }
                    prop_assert_eq!(r.inits, 1);
                    prop_assert!(r.aborts <= 1);
                }

                // After the sweep only active tasks remain, and every one of them is tracked as active.
                let live = t.records.iter().filter(|r| r.active).count();
                prop_assert_eq!(s.main_len() + s.sub_len(), live);
                prop_assert_eq!(s.active_ids().len(), live);
                let stats = s.stats();
                prop_assert_eq!(stats.assigned as usize, t.records.len());
                prop_assert_eq!(stats.aborted as usize, t.records.len() - live);
            }

            s.shutdown(AGENT, &mut env);
            prop_assert!(s.is_empty());
            let t = tracker.lock().unwrap();
            for r in &t.records {
                // Tasks assigned by abort hooks during the final shutdown round may be
                // dropped without an abort, but never aborted twice.
                prop_assert!(r.aborts <= 1);
            }
        }
    }
}
