//! Integration tests for per-client ordering and mutual exclusion under real
//! worker threads, including the stealing path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use workerpool_scheduler::{ClientId, DispatchPolicy, Scheduler, SchedulerConfig, StealOrder};

const WAIT: Duration = Duration::from_secs(20);

// ============================================================================
// Test Helpers
// ============================================================================

/// Tracks which clients have a task running and counts overlaps.
#[derive(Default)]
struct ExclusivityProbe {
    active: Mutex<HashMap<ClientId, Arc<AtomicBool>>>,
    violations: AtomicUsize,
}

impl ExclusivityProbe {
    fn flag(&self, client_id: ClientId) -> Arc<AtomicBool> {
        Arc::clone(
            self.active
                .lock()
                .unwrap()
                .entry(client_id)
                .or_insert_with(|| Arc::new(AtomicBool::new(false))),
        )
    }

    /// Body shared by every probe task: mark active, linger, unmark.
    fn run(&self, client_id: ClientId, linger: Duration) {
        let flag = self.flag(client_id);
        if flag.swap(true, Ordering::SeqCst) {
            self.violations.fetch_add(1, Ordering::SeqCst);
        }
        thread::sleep(linger);
        flag.store(false, Ordering::SeqCst);
    }
}

/// Execution log of (client, sequence number) pairs.
type Log = Arc<Mutex<Vec<(ClientId, usize)>>>;

fn sequences_by_client(log: &Log) -> HashMap<ClientId, Vec<usize>> {
    let mut by_client: HashMap<ClientId, Vec<usize>> = HashMap::new();
    for (client, seq) in log.lock().unwrap().iter() {
        by_client.entry(*client).or_default().push(*seq);
    }
    by_client
}

fn config(workers: usize, order: StealOrder) -> SchedulerConfig {
    let mut config = SchedulerConfig::with_workers(workers);
    config.steal_order = order;
    config
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn two_workers_client_tasks_serialize() {
    let scheduler = Scheduler::with_workers(2).unwrap();
    let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

    for (client, label) in [(1, "A1"), (1, "A2"), (2, "B1")] {
        let events = Arc::clone(&events);
        scheduler
            .add_task(client, move || {
                events.lock().unwrap().push(format!("{label} start"));
                thread::sleep(Duration::from_millis(30));
                events.lock().unwrap().push(format!("{label} end"));
            })
            .unwrap();
    }

    scheduler.start().unwrap();
    assert!(scheduler.wait_idle(WAIT));
    scheduler.stop();
    scheduler.join();

    let events = events.lock().unwrap();
    let pos = |s: &str| events.iter().position(|e| e == s).unwrap();
    assert!(pos("A1 end") < pos("A2 start"), "A2 overlapped A1: {events:?}");
    assert!(pos("B1 start") < pos("B1 end"));
    assert_eq!(events.len(), 6);
    assert_eq!(scheduler.pending_tasks(), 0);
    assert!(scheduler.is_idle());
}

#[test]
fn single_worker_interleaved_clients() {
    let scheduler = Scheduler::with_workers(1).unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));

    for seq in 0..20 {
        for client in [3, 7] {
            let log = Arc::clone(&log);
            scheduler
                .add_task(client, move || log.lock().unwrap().push((client, seq)))
                .unwrap();
        }
    }

    scheduler.start().unwrap();
    assert!(scheduler.wait_idle(WAIT));
    scheduler.stop();
    scheduler.join();

    let by_client = sequences_by_client(&log);
    assert_eq!(by_client[&3], (0..20).collect::<Vec<_>>());
    assert_eq!(by_client[&7], (0..20).collect::<Vec<_>>());
}

// ============================================================================
// Properties
// ============================================================================

#[test]
fn fifo_per_client_with_concurrent_submitters() {
    for order in [StealOrder::Fixed, StealOrder::Rotating] {
        let scheduler = Arc::new(Scheduler::new(config(4, order)).unwrap());
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        scheduler.start().unwrap();

        let submitters: Vec<_> = (0..4)
            .map(|t| {
                let scheduler = Arc::clone(&scheduler);
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    // Each submitter owns three clients, one of them negative.
                    let clients = [t * 3, t * 3 + 1, -(t * 3 + 2)];
                    for seq in 0..50 {
                        for client in clients {
                            let log = Arc::clone(&log);
                            scheduler
                                .add_task(client, move || log.lock().unwrap().push((client, seq)))
                                .unwrap();
                        }
                    }
                })
            })
            .collect();
        for s in submitters {
            s.join().unwrap();
        }

        assert!(scheduler.wait_idle(WAIT));
        scheduler.stop();
        scheduler.join();

        let by_client = sequences_by_client(&log);
        assert_eq!(by_client.len(), 12);
        for (client, seqs) in by_client {
            assert_eq!(seqs, (0..50).collect::<Vec<_>>(), "client {client} out of order");
        }
    }
}

#[test]
fn no_client_runs_twice_at_once() {
    let scheduler = Scheduler::with_workers(4).unwrap();
    let probe = Arc::new(ExclusivityProbe::default());

    // Clients 0, 4, 8 share worker 0, so peers must steal to stay busy.
    for _ in 0..15 {
        for client in [0, 4, 8, 1, 2] {
            let probe = Arc::clone(&probe);
            scheduler
                .add_task(client, move || probe.run(client, Duration::from_millis(2)))
                .unwrap();
        }
    }

    scheduler.start().unwrap();
    assert!(scheduler.wait_idle(WAIT));
    scheduler.stop();
    scheduler.join();

    assert_eq!(probe.violations.load(Ordering::SeqCst), 0);
    assert_eq!(scheduler.metrics().total_completed(), 75);
}

#[test]
fn idle_workers_steal_from_busy_peer() {
    let scheduler = Scheduler::with_workers(4).unwrap();
    let done = Arc::new(AtomicUsize::new(0));

    // Every client routes to worker 0.
    for i in 0..16 {
        let done = Arc::clone(&done);
        scheduler
            .add_task(i * 4, move || {
                thread::sleep(Duration::from_millis(20));
                done.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
    }
    assert_eq!(scheduler.metrics().workers[0].pending, 16);

    scheduler.start().unwrap();
    assert!(scheduler.wait_idle(WAIT));
    scheduler.stop();
    scheduler.join();

    let metrics = scheduler.metrics();
    assert_eq!(done.load(Ordering::SeqCst), 16);
    assert!(metrics.total_stolen() > 0, "expected stealing: {metrics:?}");
    assert_eq!(metrics.workers[0].stolen, 0, "worker 0 had nothing to steal");
}

#[test]
fn partitioned_policy_keeps_clients_home() {
    let mut config = SchedulerConfig::with_workers(3);
    config.policy = DispatchPolicy::Partitioned;
    let scheduler = Scheduler::new(config).unwrap();
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let homes = Arc::new(Mutex::new(Vec::new()));

    for seq in 0..30 {
        let client = (seq % 6) as ClientId;
        let log = Arc::clone(&log);
        let homes = Arc::clone(&homes);
        scheduler
            .add_task(client, move || {
                let worker = workerpool_scheduler::current_worker();
                homes.lock().unwrap().push((client, worker));
                log.lock().unwrap().push((client, seq));
            })
            .unwrap();
    }

    scheduler.start().unwrap();
    assert!(scheduler.wait_idle(WAIT));
    scheduler.stop();
    scheduler.join();

    assert_eq!(scheduler.metrics().total_stolen(), 0);
    for (client, worker) in homes.lock().unwrap().iter() {
        assert_eq!(*worker, Some(scheduler.worker_for(*client)));
    }
    for (client, seqs) in sequences_by_client(&log) {
        let mut sorted = seqs.clone();
        sorted.sort_unstable();
        assert_eq!(seqs, sorted, "client {client} out of order");
    }
}
