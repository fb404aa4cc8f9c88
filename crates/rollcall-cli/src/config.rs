use std::path::PathBuf;

use rollcall_core::DEFAULT_TOLERANCE;
use rollcall_vision::DEFAULT_SOCKET_PATH;

/// CLI configuration, loaded from `ROLLCALL_*` environment variables
/// with defaults. Flags on individual subcommands take precedence.
pub struct Config {
    /// Path to the SQLite database shared with rollcalld.
    pub db_path: PathBuf,
    /// Unix socket of the face service.
    pub vision_socket: PathBuf,
    /// Embedding distance tolerance; lower is stricter.
    pub tolerance: f32,
    /// Dispute link included in absence notices.
    pub dispute_link: String,
    pub smtp: SmtpConfig,
}

pub struct SmtpConfig {
    pub host: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: Option<String>,
}

impl Config {
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("rollcall.db"));

        Self {
            db_path,
            vision_socket: std::env::var("ROLLCALL_VISION_SOCKET")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_SOCKET_PATH)),
            tolerance: env_f32("ROLLCALL_TOLERANCE", DEFAULT_TOLERANCE),
            dispute_link: std::env::var("ROLLCALL_DISPUTE_LINK")
                .unwrap_or_else(|_| "http://localhost:5000/raise_query".to_string()),
            smtp: SmtpConfig {
                host: std::env::var("ROLLCALL_SMTP_HOST")
                    .unwrap_or_else(|_| "smtp.gmail.com".to_string()),
                user: std::env::var("ROLLCALL_SMTP_USER").ok(),
                password: std::env::var("ROLLCALL_SMTP_PASSWORD").ok(),
                from: std::env::var("ROLLCALL_SMTP_FROM").ok(),
            },
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
