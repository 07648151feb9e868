//! Services used by the project context.
//!
//! - [`ScratchPathResolver`]: per-user scratch storage under the project directory
//! - [`EncodingResolver`]: validates the project encoding, falling back to UTF-8
//! - [`WriteProbe`]: checks that the project directory accepts new files
//! - [`DirectoryMonitor`]: watches the project tree ([`NotifyMonitor`] for the real filesystem)
//!
//! Each collaborator sits behind a trait so the context can be exercised with
//! doubles; the default implementations are what the binary uses.

pub mod encoding;
pub mod monitor;
pub mod probe;
pub mod scratch;

pub use encoding::{EncodingResolution, EncodingResolver, EncodingRsValidator, EncodingValidator};
pub use monitor::{DirectoryMonitor, FileListingFilter, NotifyMonitor, scan_tree};
pub use probe::{TempFileProbe, WriteProbe};
pub use scratch::{PROJECT_USER_DIR, ScratchPathError, ScratchPathResolver};
