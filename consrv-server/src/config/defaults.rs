//! Default configuration values
//!
//! These are embedded in the binary and used when no config file exists.

/// Default configuration as TOML (for reference/documentation)
pub const DEFAULT_CONFIG_TOML: &str = r##"
# consrv configuration

[launch]
force_no_handoff = false
headless = false
create_server_handle = false
handoff_target = false

[handoff]
# Registered alternate console
# target = "00000000-0000-0000-0000-000000000000"

[history]
buffer_count = 4
"##;
