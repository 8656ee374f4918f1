//! Field checks shared by config loading and the `validate-env` command.

use serde::Serialize;
use validator::{ValidateEmail, ValidateUrl};

use super::{FeatureFlags, RawEnv};

pub const LOG_LEVELS: &[&str] = &["error", "warn", "info", "debug"];
pub const ENVIRONMENTS: &[&str] = &["development", "staging", "production", "test"];
pub const MIN_ENCRYPTION_KEY_LEN: usize = 32;

pub fn check_url(value: &str) -> Result<(), String> {
    if value.validate_url() {
        Ok(())
    } else {
        Err("must be a valid URL".to_string())
    }
}

pub fn check_email(value: &str) -> Result<(), String> {
    if value.validate_email() {
        Ok(())
    } else {
        Err("must be a valid email address".to_string())
    }
}

pub fn check_positive_int(value: &str) -> Result<u64, String> {
    match value.trim().parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err("must be a positive integer".to_string()),
    }
}

pub fn check_encryption_key(value: &str) -> Result<(), String> {
    if value.chars().count() >= MIN_ENCRYPTION_KEY_LEN {
        Ok(())
    } else {
        Err(format!(
            "must be at least {} characters",
            MIN_ENCRYPTION_KEY_LEN
        ))
    }
}

pub fn check_one_of(value: &str, allowed: &[&str]) -> Result<(), String> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(format!("must be one of: {}", allowed.join(", ")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Valid,
    Missing,
    Invalid,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub category: &'static str,
    pub key: &'static str,
    pub status: EntryStatus,
    pub message: String,
    pub required: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub entries: Vec<ReportEntry>,
    pub features: FeatureFlags,
}

type Check = fn(&str) -> Result<(), String>;

impl ValidationReport {
    /// Inspect the environment as given, without fallback secrets.
    pub fn from_raw(raw: &RawEnv) -> Self {
        let raw = raw.clone().normalized();
        let mut entries = Vec::new();
        let mut push = |category: &'static str,
                        key: &'static str,
                        value: &Option<String>,
                        required: bool,
                        check: Option<Check>,
                        configured: &str| {
            let (status, message) = match value {
                None if required => (EntryStatus::Missing, format!("{} is required", key)),
                None => (EntryStatus::Missing, format!("{} not configured (optional)", key)),
                Some(v) => match check.map(|c| c(v)) {
                    Some(Err(reason)) => (EntryStatus::Invalid, format!("{} {}", key, reason)),
                    _ => (EntryStatus::Valid, configured.to_string()),
                },
            };
            entries.push(ReportEntry {
                category,
                key,
                status,
                message,
                required,
            });
        };

        push("Authentication", "AUTH_SECRET", &raw.auth_secret, true, None, "Session signing secret configured");
        push("Authentication", "AUTH_URL", &raw.auth_url, false, Some(check_url), "Auth URL configured");
        push(
            "Authentication",
            "ENCRYPTION_KEY",
            &raw.encryption_key,
            false,
            Some(check_encryption_key),
            "Encryption key configured",
        );

        push("Hosted Auth", "STACK_PROJECT_ID", &raw.stack_project_id, false, None, "Hosted auth project id configured");
        push(
            "Hosted Auth",
            "STACK_PUBLISHABLE_CLIENT_KEY",
            &raw.stack_publishable_client_key,
            false,
            None,
            "Hosted auth publishable client key configured",
        );
        push(
            "Hosted Auth",
            "STACK_SECRET_SERVER_KEY",
            &raw.stack_secret_server_key,
            false,
            None,
            "Hosted auth secret server key configured",
        );

        push("Database", "DATABASE_URL", &raw.database_url, true, None, "Database URL configured");
        push(
            "Database",
            "DB_MAX_CONNECTIONS",
            &raw.db_max_connections,
            false,
            Some(|v| check_positive_int(v).map(|_| ())),
            "Pool size configured",
        );

        push("Email", "SMTP_HOST", &raw.smtp_host, false, None, "Email service configured");
        push("Email", "FROM_EMAIL", &raw.from_email, false, Some(check_email), "Sender address configured");

        let storage = raw.aws_access_key_id.clone().or_else(|| raw.uploadthing_secret.clone());
        push("Storage", "AWS_ACCESS_KEY_ID|UPLOADTHING_SECRET", &storage, false, None, "File storage configured");

        push("OAuth", "GOOGLE_CLIENT_ID", &raw.google_client_id, false, None, "Google sign-in configured");
        push("OAuth", "FACEBOOK_CLIENT_ID", &raw.facebook_client_id, false, None, "Facebook sign-in configured");
        push("OAuth", "TWITTER_CLIENT_ID", &raw.twitter_client_id, false, None, "Twitter sign-in configured");

        Self {
            entries,
            features: FeatureFlags::from_raw(&raw),
        }
    }

    pub fn valid_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.status == EntryStatus::Valid)
            .count()
    }

    pub fn failed_required(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.required && e.status != EntryStatus::Valid)
            .count()
    }

    pub fn missing_optional(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| !e.required && e.status != EntryStatus::Valid)
            .count()
    }

    pub fn passed(&self) -> bool {
        self.failed_required() == 0
            && !self.entries.iter().any(|e| e.status == EntryStatus::Invalid)
    }

    /// Human-readable report grouped by category.
    pub fn render(&self) -> String {
        let mut out = String::from("\nEnvironment Validation Results\n");
        out.push_str(&"=".repeat(50));
        out.push('\n');

        let mut categories: Vec<&str> = Vec::new();
        for entry in &self.entries {
            if !categories.contains(&entry.category) {
                categories.push(entry.category);
            }
        }

        for category in categories {
            out.push_str(&format!("\n{}\n{}\n", category, "-".repeat(category.len())));
            for entry in self.entries.iter().filter(|e| e.category == category) {
                let status = match entry.status {
                    EntryStatus::Valid => "VALID",
                    EntryStatus::Missing => "MISSING",
                    EntryStatus::Invalid => "INVALID",
                };
                let marker = match (entry.status, entry.required) {
                    (EntryStatus::Valid, _) => "ok",
                    (_, true) => "!!",
                    (_, false) => "--",
                };
                out.push_str(&format!("  [{}] {:<8} {}\n", marker, status, entry.message));
            }
        }

        out.push_str("\nSummary\n-------\n");
        out.push_str(&format!("Valid configurations: {}\n", self.valid_count()));
        out.push_str(&format!("Missing or invalid required: {}\n", self.failed_required()));
        out.push_str(&format!("Missing optional: {}\n", self.missing_optional()));

        let on_off = |b: bool| if b { "Enabled" } else { "Disabled" };
        out.push_str("\nFeature Status\n--------------\n");
        out.push_str(&format!("Social Login: {}\n", on_off(self.features.social_login)));
        out.push_str(&format!("Email Verification: {}\n", on_off(self.features.email_verification)));
        out.push_str(&format!("Two-Factor Auth: {}\n", on_off(self.features.two_factor_auth)));
        out.push_str(&format!("Investment Tracking: {}\n", on_off(self.features.investment_tracking)));
        out.push_str(&format!("Real-time Updates: {}\n", on_off(self.features.real_time_updates)));
        out.push_str(&format!("Maintenance Mode: {}\n", on_off(self.features.maintenance_mode)));

        if self.passed() {
            out.push_str("\nValidation Passed\n");
        } else {
            out.push_str("\nValidation Failed\n");
        }
        out
    }
}
