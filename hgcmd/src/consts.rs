/// The executable name used when the caller does not supply one.
pub const DEFAULT_HG_EXECUTABLE: &str = "hg";

/// Some host I/O primitives cap a single read/write at a signed 32 bit
/// count. Reads/writes larger than this are split into two halves so we
/// never hand the OS a length it can't represent.
pub const MAX_SINGLE_IO: usize = i32::MAX as usize;

/// Literal command prefix for a `runcommand` submission.
pub const RUNCOMMAND_PREFIX: &[u8] = b"runcommand\n";
