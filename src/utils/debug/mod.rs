/*
 * Debugging and Logging Utilities
 *
 * This module contains utilities for debugging and logging,
 * providing structured logging and debug output capabilities.
 */

pub mod logger;

/// Bring up the console sink used for logging, before `logger::init`.
pub fn init_debug_infrastructure() {
    crate::arch::x86_64::peripheral::init_console();
}
