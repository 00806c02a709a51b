/*
 * Self-test harness
 *
 * `cargo test` can't drive a `#![no_std]` `#![no_main]` image, so the
 * end-to-end scenarios run as real kernel threads under the live
 * scheduler, invoked once from `kernel_main`. Pass/fail is reported
 * through the logger; a failed assertion here is as fatal as anywhere
 * else in the kernel, since there's no test runner to catch it.
 *
 * The waiter list's FIFO/priority-ordering properties are covered
 * separately by the `#[cfg(test)]` unit tests in `sync::list`, which
 * need no scheduler and run on the host target.
 */

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

use crate::config::PRIORITY_DEFAULT;
use crate::error::KernelError;
use crate::scheduler;
use crate::sync::{Mutex, Queue, Semaphore};

pub fn run_self_tests() {
    log::info!("self-tests: starting");
    test_mutex_mutual_exclusion();
    test_semaphore_rendezvous();
    test_bounded_queue();
    test_sleep_ordering();
    test_preemption_by_higher_priority();
    test_destroy_while_waiting();
    log::info!("self-tests: all passed");
}

fn expect(cond: bool, msg: &str) {
    if !cond {
        crate::arch::x86_64::diagnostics::kernel_panic(msg);
    }
}

// Two equal-priority threads each pend/increment/post in a loop; after
// both join, the counter must equal the sum exactly, proving the mutex
// serializes every increment.
static MUTEX_TEST: Mutex = Mutex::new();
static MUTEX_COUNTER: AtomicU64 = AtomicU64::new(0);
const MUTEX_ITERATIONS: u64 = 100_000;

fn mutex_worker(_arg: usize) {
    for _ in 0..MUTEX_ITERATIONS {
        MUTEX_TEST.lock().expect("mutex lock");
        let cur = MUTEX_COUNTER.load(Ordering::Relaxed);
        MUTEX_COUNTER.store(cur + 1, Ordering::Relaxed);
        MUTEX_TEST.unlock().expect("mutex unlock");
    }
}

fn test_mutex_mutual_exclusion() {
    MUTEX_TEST.init().expect("mutex init");
    MUTEX_COUNTER.store(0, Ordering::SeqCst);

    let t1 = scheduler::spawn("mutex-a", PRIORITY_DEFAULT, mutex_worker, 0).expect("spawn mutex-a");
    let t2 = scheduler::spawn("mutex-b", PRIORITY_DEFAULT, mutex_worker, 0).expect("spawn mutex-b");

    scheduler::join(t1).expect("join mutex-a");
    scheduler::join(t2).expect("join mutex-b");

    expect(
        MUTEX_COUNTER.load(Ordering::SeqCst) == MUTEX_ITERATIONS * 2,
        "mutex mutual exclusion violated: lost updates under contention",
    );
    log::info!("self-tests: mutex mutual exclusion ok");
}

// Three semaphores chained T0->T1->T2->T0, three cycles each. The
// observed order must be exactly 0,1,2 repeated three times.
static RENDEZVOUS_SEM: [Semaphore; 3] = [Semaphore::new(), Semaphore::new(), Semaphore::new()];
static RENDEZVOUS_ORDER: [AtomicU32; 9] = [
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
    AtomicU32::new(0),
];
static RENDEZVOUS_CURSOR: AtomicU32 = AtomicU32::new(0);

fn rendezvous_worker(idx: usize) {
    for _ in 0..3 {
        RENDEZVOUS_SEM[idx].pend().expect("sem pend");
        let slot = RENDEZVOUS_CURSOR.fetch_add(1, Ordering::SeqCst) as usize;
        if slot < RENDEZVOUS_ORDER.len() {
            RENDEZVOUS_ORDER[slot].store(idx as u32, Ordering::SeqCst);
        }
        RENDEZVOUS_SEM[(idx + 1) % 3].post().expect("sem post");
    }
}

fn test_semaphore_rendezvous() {
    for sem in RENDEZVOUS_SEM.iter() {
        sem.init(0).expect("sem init");
    }
    RENDEZVOUS_CURSOR.store(0, Ordering::SeqCst);

    let t0 = scheduler::spawn("rendezvous-0", PRIORITY_DEFAULT, rendezvous_worker, 0)
        .expect("spawn rendezvous-0");
    let t1 = scheduler::spawn("rendezvous-1", PRIORITY_DEFAULT, rendezvous_worker, 1)
        .expect("spawn rendezvous-1");
    let t2 = scheduler::spawn("rendezvous-2", PRIORITY_DEFAULT, rendezvous_worker, 2)
        .expect("spawn rendezvous-2");

    RENDEZVOUS_SEM[0].post().expect("seed rendezvous");

    scheduler::join(t0).expect("join rendezvous-0");
    scheduler::join(t1).expect("join rendezvous-1");
    scheduler::join(t2).expect("join rendezvous-2");

    for (i, cell) in RENDEZVOUS_ORDER.iter().enumerate() {
        let expected = (i % 3) as u32;
        expect(
            cell.load(Ordering::SeqCst) == expected,
            "semaphore rendezvous out of order",
        );
    }
    log::info!("self-tests: semaphore rendezvous ok");
}

// One producer, one consumer, bounded queue of capacity 8, N items. The
// consumer must see exactly 1..=N with no gaps or duplicates.
static QUEUE_TEST: Queue<u32, 8> = Queue::new();
const QUEUE_ITEM_COUNT: u32 = 10_000;
static QUEUE_LAST_SEEN: AtomicU32 = AtomicU32::new(0);
static QUEUE_GAP_DETECTED: AtomicU32 = AtomicU32::new(0);

fn queue_producer(_arg: usize) {
    for i in 1..=QUEUE_ITEM_COUNT {
        QUEUE_TEST.post(i).expect("queue post");
    }
}

fn queue_consumer(_arg: usize) {
    for _ in 0..QUEUE_ITEM_COUNT {
        let item = QUEUE_TEST.pend().expect("queue pend");
        let prev = QUEUE_LAST_SEEN.swap(item, Ordering::SeqCst);
        if item != prev + 1 {
            QUEUE_GAP_DETECTED.store(1, Ordering::SeqCst);
        }
    }
}

fn test_bounded_queue() {
    QUEUE_TEST.init().expect("queue init");
    QUEUE_LAST_SEEN.store(0, Ordering::SeqCst);
    QUEUE_GAP_DETECTED.store(0, Ordering::SeqCst);

    let consumer =
        scheduler::spawn("queue-consumer", PRIORITY_DEFAULT, queue_consumer, 0).expect("spawn consumer");
    let producer =
        scheduler::spawn("queue-producer", PRIORITY_DEFAULT, queue_producer, 0).expect("spawn producer");

    scheduler::join(producer).expect("join producer");
    scheduler::join(consumer).expect("join consumer");

    expect(QUEUE_GAP_DETECTED.load(Ordering::SeqCst) == 0, "bounded queue lost or duplicated an item");
    expect(
        QUEUE_LAST_SEEN.load(Ordering::SeqCst) == QUEUE_ITEM_COUNT,
        "bounded queue consumer did not observe all items",
    );
    log::info!("self-tests: bounded queue producer/consumer ok");
}

// sleep(100) issued before sleep(50); the shorter sleep must resume
// first.
static SLEEP_ORDER: [AtomicU32; 2] = [AtomicU32::new(0), AtomicU32::new(0)];
static SLEEP_CURSOR: AtomicU32 = AtomicU32::new(0);

fn sleeper(ms: usize) {
    scheduler::sleep_ms(ms as u64);
    let slot = SLEEP_CURSOR.fetch_add(1, Ordering::SeqCst) as usize;
    if slot < SLEEP_ORDER.len() {
        SLEEP_ORDER[slot].store(ms as u32, Ordering::SeqCst);
    }
}

fn test_sleep_ordering() {
    SLEEP_CURSOR.store(0, Ordering::SeqCst);

    let long = scheduler::spawn("sleep-long", PRIORITY_DEFAULT, sleeper, 100).expect("spawn sleep-long");
    let short = scheduler::spawn("sleep-short", PRIORITY_DEFAULT, sleeper, 50).expect("spawn sleep-short");

    scheduler::join(long).expect("join sleep-long");
    scheduler::join(short).expect("join sleep-short");

    expect(
        SLEEP_ORDER[0].load(Ordering::SeqCst) == 50 && SLEEP_ORDER[1].load(Ordering::SeqCst) == 100,
        "shorter sleep did not resume first",
    );
    log::info!("self-tests: sleep ordering ok");
}

// A low-priority thread busy-loops counting iterations; once a strictly
// higher-priority thread becomes ready, the scheduler must run it to
// completion before the low-priority thread makes further progress.
static PREEMPT_STOP_LOW: AtomicBool = AtomicBool::new(false);
static PREEMPT_LOW_PROGRESS: AtomicU64 = AtomicU64::new(0);
static PREEMPT_LOW_AT_HIGH_START: AtomicU64 = AtomicU64::new(0);
static PREEMPT_LOW_AT_HIGH_END: AtomicU64 = AtomicU64::new(0);

fn preempt_low_worker(_arg: usize) {
    while !PREEMPT_STOP_LOW.load(Ordering::Relaxed) {
        PREEMPT_LOW_PROGRESS.fetch_add(1, Ordering::Relaxed);
    }
}

fn preempt_high_worker(_arg: usize) {
    PREEMPT_LOW_AT_HIGH_START.store(PREEMPT_LOW_PROGRESS.load(Ordering::SeqCst), Ordering::SeqCst);
    let mut sum: u64 = 0;
    for i in 0..10_000u64 {
        sum = sum.wrapping_add(i);
    }
    core::hint::black_box(sum);
    PREEMPT_LOW_AT_HIGH_END.store(PREEMPT_LOW_PROGRESS.load(Ordering::SeqCst), Ordering::SeqCst);
}

fn test_preemption_by_higher_priority() {
    PREEMPT_STOP_LOW.store(false, Ordering::SeqCst);
    PREEMPT_LOW_PROGRESS.store(0, Ordering::SeqCst);

    let low = scheduler::spawn("preempt-low", PRIORITY_DEFAULT + 10, preempt_low_worker, 0)
        .expect("spawn preempt-low");

    scheduler::sleep_ms(20);

    let high = scheduler::spawn("preempt-high", PRIORITY_DEFAULT - 10, preempt_high_worker, 0)
        .expect("spawn preempt-high");
    scheduler::join(high).expect("join preempt-high");

    PREEMPT_STOP_LOW.store(true, Ordering::SeqCst);
    scheduler::join(low).expect("join preempt-low");

    let delta = PREEMPT_LOW_AT_HIGH_END.load(Ordering::SeqCst)
        - PREEMPT_LOW_AT_HIGH_START.load(Ordering::SeqCst);
    expect(
        delta < 1_000,
        "low-priority thread advanced while a higher-priority thread was runnable",
    );
    expect(
        PREEMPT_LOW_PROGRESS.load(Ordering::SeqCst) > PREEMPT_LOW_AT_HIGH_END.load(Ordering::SeqCst),
        "low-priority thread failed to resume after the higher-priority thread completed",
    );
    log::info!("self-tests: preemption by higher priority ok");
}

// A thread pends on an empty semaphore; another thread destroys it. The
// pending thread's call must return Uninitialized instead of blocking
// forever.
static DESTROY_SEM: Semaphore = Semaphore::new();
static DESTROY_RESULT: AtomicU32 = AtomicU32::new(u32::MAX);

fn destroy_waiter(_arg: usize) {
    match DESTROY_SEM.pend() {
        Err(KernelError::Uninitialized) => DESTROY_RESULT.store(1, Ordering::SeqCst),
        _ => DESTROY_RESULT.store(0, Ordering::SeqCst),
    }
}

fn destroyer(_arg: usize) {
    scheduler::sleep_ms(10);
    DESTROY_SEM.destroy().expect("sem destroy");
}

fn test_destroy_while_waiting() {
    DESTROY_SEM.init(0).expect("sem init");
    DESTROY_RESULT.store(u32::MAX, Ordering::SeqCst);

    let waiter =
        scheduler::spawn("destroy-waiter", PRIORITY_DEFAULT, destroy_waiter, 0).expect("spawn waiter");
    let destroyer_id =
        scheduler::spawn("destroy-destroyer", PRIORITY_DEFAULT, destroyer, 0).expect("spawn destroyer");

    scheduler::join(waiter).expect("join waiter");
    scheduler::join(destroyer_id).expect("join destroyer");

    expect(
        DESTROY_RESULT.load(Ordering::SeqCst) == 1,
        "pend on a destroyed semaphore did not surface Uninitialized",
    );
    log::info!("self-tests: destroy-while-waiting ok");
}
