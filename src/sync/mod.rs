/*
 * Synchronization primitives
 *
 * Everything here is built on the same two ideas: a priority waiter list
 * (`list`) and the scheduler's park/wake protocol. `irqlock` is the
 * exception — it is what the scheduler itself uses to protect its own
 * bookkeeping, and what the other primitives use to protect theirs.
 */

pub mod irqlock;
pub mod list;
pub mod mailbox;
pub mod mutex;
pub mod queue;
pub mod semaphore;

pub use mailbox::Mailbox;
pub use mutex::Mutex;
pub use queue::Queue;
pub use semaphore::Semaphore;
