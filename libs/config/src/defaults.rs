//! Configuration defaults
//!
//! Default values shared by the configuration structs and the runtime
//! crates, kept in one place so documentation and code agree.

/// Door actor defaults
pub mod actors {
    /// Mailbox capacity per door
    pub const MAILBOX_CAPACITY: usize = 1000;

    /// Deadline for one push/pop/get exchange (milliseconds)
    pub const REQUEST_TIMEOUT_MS: u64 = 5_000;
}

/// Supervisor defaults
pub mod supervision {
    /// Restarts allowed per door within the window
    pub const MAX_RESTARTS: u32 = 5;

    /// Restart counting window (seconds)
    pub const RESTART_WINDOW_SECS: u64 = 60;

    /// Pause before a crashed door is started again (milliseconds)
    pub const RESTART_DELAY_MS: u64 = 10;

    /// Upper bound for waiting on a replacement door (milliseconds)
    pub const RESTART_TIMEOUT_MS: u64 = 5_000;

    /// Maximum number of doors per supervisor
    pub const MAX_CHILDREN: usize = 1024;
}

/// Logging defaults
pub mod logging {
    /// Level used when RUST_LOG is not set
    pub const LEVEL: &str = "info";

    /// Environment variable prefix for configuration overrides
    pub const ENV_PREFIX: &str = "PORTAL";
}
