use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::dispatch::{
    DispatchPolicy, DispatchPolicyKind, DEFAULT_BATCH_DELAY_MS, DEFAULT_BATCH_SIZE,
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_SEND_DELAY_MS, DEFAULT_SEND_JITTER_MS,
};
use crate::mail::{DEFAULT_BODY_MAX_CHARS, DEFAULT_SMTP_RELAY, DEFAULT_SUBJECT_MAX_CHARS};
use crate::quota::{DEFAULT_RESET_INTERVAL_SECS, DEFAULT_SENDER_CAP};
use crate::relay::ContentLimits;

#[derive(Debug, Clone)]
pub struct MailerConfig {
    pub server_host: String,
    pub server_port: u16,
    pub static_dir: PathBuf,
    pub request_timeout_secs: u64,
    pub smtp_relay: String,
    pub smtp_timeout_secs: u64,
    pub quota_cap: u64,
    pub quota_reset_interval_secs: u64,
    pub dispatch_policy: DispatchPolicyKind,
    pub send_delay_ms: u64,
    pub send_jitter_ms: u64,
    pub failure_threshold: u32,
    pub batch_size: usize,
    pub batch_delay_ms: u64,
    pub subject_max_chars: usize,
    pub body_max_chars: usize,
    pub log_level: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            static_dir: PathBuf::from("public"),
            request_timeout_secs: 300,
            smtp_relay: DEFAULT_SMTP_RELAY.to_string(),
            smtp_timeout_secs: 30,
            quota_cap: DEFAULT_SENDER_CAP,
            quota_reset_interval_secs: DEFAULT_RESET_INTERVAL_SECS,
            dispatch_policy: DispatchPolicyKind::Sequential,
            send_delay_ms: DEFAULT_SEND_DELAY_MS,
            send_jitter_ms: DEFAULT_SEND_JITTER_MS,
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            batch_size: DEFAULT_BATCH_SIZE,
            batch_delay_ms: DEFAULT_BATCH_DELAY_MS,
            subject_max_chars: DEFAULT_SUBJECT_MAX_CHARS,
            body_max_chars: DEFAULT_BODY_MAX_CHARS,
            log_level: "info".to_string(),
        }
    }
}

impl MailerConfig {
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();

        if let Ok(host) = env::var("HOST") {
            cfg.server_host = host;
        }
        override_parsed(&mut cfg.server_port, "PORT")?;
        if let Ok(dir) = env::var("STATIC_DIR") {
            cfg.static_dir = PathBuf::from(dir);
        }
        override_parsed(&mut cfg.request_timeout_secs, "REQUEST_TIMEOUT_SECS")?;
        if let Ok(relay) = env::var("SMTP_RELAY") {
            cfg.smtp_relay = relay;
        }
        override_parsed(&mut cfg.smtp_timeout_secs, "SMTP_TIMEOUT_SECS")?;
        override_parsed(&mut cfg.quota_cap, "QUOTA_CAP")?;
        override_parsed(&mut cfg.quota_reset_interval_secs, "QUOTA_RESET_INTERVAL_SECS")?;
        if let Ok(policy) = env::var("DISPATCH_POLICY") {
            cfg.dispatch_policy = policy
                .parse()
                .map_err(anyhow::Error::msg)
                .context("DISPATCH_POLICY must be 'sequential' or 'batched'")?;
        }
        override_parsed(&mut cfg.send_delay_ms, "SEND_DELAY_MS")?;
        override_parsed(&mut cfg.send_jitter_ms, "SEND_JITTER_MS")?;
        override_parsed(&mut cfg.failure_threshold, "FAILURE_THRESHOLD")?;
        override_parsed(&mut cfg.batch_size, "BATCH_SIZE")?;
        override_parsed(&mut cfg.batch_delay_ms, "BATCH_DELAY_MS")?;
        override_parsed(&mut cfg.subject_max_chars, "SUBJECT_MAX_CHARS")?;
        override_parsed(&mut cfg.body_max_chars, "BODY_MAX_CHARS")?;
        if let Ok(level) = env::var("LOG_LEVEL") {
            cfg.log_level = level;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.smtp_relay.trim().is_empty() {
            anyhow::bail!("SMTP_RELAY cannot be empty");
        }
        if self.quota_cap == 0 {
            anyhow::bail!("QUOTA_CAP must be greater than zero");
        }
        if self.quota_reset_interval_secs == 0 {
            anyhow::bail!("QUOTA_RESET_INTERVAL_SECS must be greater than zero");
        }
        if self.request_timeout_secs == 0 {
            anyhow::bail!("REQUEST_TIMEOUT_SECS must be greater than zero");
        }
        if self.smtp_timeout_secs == 0 {
            anyhow::bail!("SMTP_TIMEOUT_SECS must be greater than zero");
        }
        if self.failure_threshold == 0 {
            anyhow::bail!("FAILURE_THRESHOLD must be greater than zero");
        }
        if self.batch_size == 0 {
            anyhow::bail!("BATCH_SIZE must be greater than zero");
        }
        if self.subject_max_chars == 0 || self.body_max_chars == 0 {
            anyhow::bail!("SUBJECT_MAX_CHARS and BODY_MAX_CHARS must be greater than zero");
        }

        Ok(())
    }

    pub fn dispatch_policy(&self) -> DispatchPolicy {
        match self.dispatch_policy {
            DispatchPolicyKind::Sequential => DispatchPolicy::Sequential {
                delay: Duration::from_millis(self.send_delay_ms),
                jitter: Duration::from_millis(self.send_jitter_ms),
                failure_threshold: self.failure_threshold,
            },
            DispatchPolicyKind::Batched => DispatchPolicy::Batched {
                batch_size: self.batch_size,
                delay: Duration::from_millis(self.batch_delay_ms),
            },
        }
    }

    pub fn content_limits(&self) -> ContentLimits {
        ContentLimits {
            subject_max_chars: self.subject_max_chars,
            body_max_chars: self.body_max_chars,
        }
    }

    pub fn smtp_timeout(&self) -> Duration {
        Duration::from_secs(self.smtp_timeout_secs)
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn override_parsed<T>(target: &mut T, key: &str) -> Result<()>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    if let Ok(raw) = env::var(key) {
        *target = raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is invalid: {raw}"))?;
    }
    Ok(())
}
