//! Default value functions for configuration.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Bot Defaults
// =============================================================================

pub fn default_nick() -> String {
    "scumbag".to_string()
}

pub fn default_prefix() -> char {
    '?'
}

pub fn default_quit_message() -> String {
    "I'm out.".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

// =============================================================================
// Storage Defaults
// =============================================================================

pub fn default_database_path() -> String {
    "scumbag.db".to_string()
}

// =============================================================================
// Dispatch Defaults
// =============================================================================

pub fn default_max_concurrent_lines() -> usize {
    64
}

pub fn default_http_timeout_secs() -> u64 {
    5
}

// =============================================================================
// Tool Defaults
// =============================================================================

pub fn default_aspell() -> String {
    "aspell".to_string()
}

pub fn default_figlet() -> String {
    "figlet".to_string()
}

// =============================================================================
// Server Defaults
// =============================================================================

pub fn default_reconnect_delay_secs() -> u64 {
    5
}
