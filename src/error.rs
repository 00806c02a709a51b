/*
 * Kernel Error Taxonomy
 *
 * A single enum shared by every fallible public operation in the kernel
 * core (interrupt registration, thread management, synchronization
 * primitives). Internal invariant violations do not go through this type;
 * they call `kernel_panic` instead, since there is nothing a caller could
 * do to recover from a corrupted scheduler structure.
 */

use core::fmt;

/// Error returned by fallible kernel-core operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    /// A required pointer/handle argument was null or absent.
    NullPointer,
    /// An index or count fell outside the valid range for the operation.
    OutOfBound,
    /// The requested interrupt vector is not part of the dispatchable range.
    UnauthorizedLine,
    /// Attempted to register a handler on a vector that already has one.
    AlreadyRegistered,
    /// Attempted to remove a handler from a vector that has none.
    NotRegistered,
    /// The given IRQ number does not correspond to a platform line.
    NoSuchIrq,
    /// Heap allocation failed while servicing the request.
    AllocFailed,
    /// The operation is not permitted in the caller's current context
    /// (e.g. blocking from interrupt context, exiting the idle thread).
    UnauthorizedAction,
    /// The requested priority lies outside `0..=PRIORITY_IDLE`.
    ForbiddenPriority,
    /// The primitive or subsystem was used before `init()` or after `destroy()`.
    Uninitialized,
    /// No thread, process, or object exists with the given identifier.
    NoSuchId,
    /// A non-blocking mutex acquisition found the mutex already held.
    MutexLocked,
    /// Attempted to release a mutex that the caller does not currently hold.
    NotLocked,
    /// A semaphore operation could not proceed given its current count.
    SemLocked,
    /// A bounded queue or mailbox is full and cannot accept another item.
    Full,
    /// A bounded queue or mailbox is empty and has nothing to hand out.
    Empty,
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            KernelError::NullPointer => "null pointer",
            KernelError::OutOfBound => "index out of bound",
            KernelError::UnauthorizedLine => "vector is not dispatchable",
            KernelError::AlreadyRegistered => "handler already registered",
            KernelError::NotRegistered => "no handler registered",
            KernelError::NoSuchIrq => "no such IRQ line",
            KernelError::AllocFailed => "allocation failed",
            KernelError::UnauthorizedAction => "action not permitted in this context",
            KernelError::ForbiddenPriority => "priority out of range",
            KernelError::Uninitialized => "object not initialized",
            KernelError::NoSuchId => "no such identifier",
            KernelError::MutexLocked => "mutex already held",
            KernelError::NotLocked => "mutex not held",
            KernelError::SemLocked => "semaphore state transition rejected",
            KernelError::Full => "container full",
            KernelError::Empty => "container empty",
        };
        f.write_str(msg)
    }
}

pub type KernelResult<T> = Result<T, KernelError>;
