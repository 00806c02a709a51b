/*
 * Thread object
 *
 * A thread owns its stack and saved context and nothing else; process
 * grouping, address spaces, and privilege levels are out of scope for
 * this core. The state machine below is Create -> Elect -> Park(Sleeping
 * | Blocked | Joining) -> Exit(-> Zombie) -> Reap(-> Dead).
 */

use alloc::boxed::Box;
use core::fmt;

use crate::arch::x86_64::context::InterruptContext;
use crate::config::THREAD_NAME_MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ThreadId(pub u32);

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Elected,
    Sleeping,
    Joining,
    Blocked,
    Zombie,
    Dead,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Mutex,
    Sem,
    Queue,
    Io,
}

fn copy_name(name: &str) -> ([u8; THREAD_NAME_MAX], usize) {
    let mut buf = [0u8; THREAD_NAME_MAX];
    let bytes = name.as_bytes();
    let len = bytes.len().min(THREAD_NAME_MAX);
    buf[..len].copy_from_slice(&bytes[..len]);
    (buf, len)
}

pub struct Thread {
    pub id: ThreadId,
    name: [u8; THREAD_NAME_MAX],
    name_len: usize,

    pub priority: u32,
    pub state: ThreadState,
    pub block_kind: Option<BlockKind>,

    pub stack: Box<[u8]>,
    pub context: InterruptContext,

    pub ppid: Option<ThreadId>,
    pub joiner: Option<ThreadId>,
    pub retval: Option<i32>,

    pub wakeup_deadline_ms: Option<u64>,

    pub cpu_time_ms: u64,
    pub last_scheduled_ms: u64,
}

impl Thread {
    pub fn new(
        id: ThreadId,
        name: &str,
        priority: u32,
        stack: Box<[u8]>,
        context: InterruptContext,
        ppid: Option<ThreadId>,
    ) -> Self {
        let (name, name_len) = copy_name(name);
        Self {
            id,
            name,
            name_len,
            priority,
            state: ThreadState::Ready,
            block_kind: None,
            stack,
            context,
            ppid,
            joiner: None,
            retval: None,
            wakeup_deadline_ms: None,
            cpu_time_ms: 0,
            last_scheduled_ms: 0,
        }
    }

    pub fn name(&self) -> &str {
        core::str::from_utf8(&self.name[..self.name_len]).unwrap_or("?")
    }
}

impl fmt::Debug for Thread {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Thread")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("priority", &self.priority)
            .field("state", &self.state)
            .finish()
    }
}
