/*
 * Kernel utility support
 *
 * Serial console output and the logging macros built on it; everything
 * a scheduler core needs to report what it's doing.
 */

pub mod writer;
#[macro_use]
pub mod macros;
pub mod debug;
