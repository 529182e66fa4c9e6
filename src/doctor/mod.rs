//! Doctor command for system diagnostics
//!
//! Checks configuration, credentials, endpoint reachability and local state
//! before a chat session is started.

use colored::Colorize;
use std::path::Path;

use crate::bedrock::{BedrockClient, EndpointStatus};
use crate::cli::Config;

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Doctor diagnostics system
pub struct Doctor {
    config: Config,
    api_key_present: bool,
}

impl Doctor {
    /// Create a doctor for the effective configuration
    pub fn new(config: Config) -> Self {
        let api_key_present = std::env::var(&config.bedrock.api_key_env)
            .map(|key| !key.trim().is_empty())
            .unwrap_or(false);
        Self {
            config,
            api_key_present,
        }
    }

    /// Run all health checks
    pub async fn run_diagnostics(&self, client: &BedrockClient) -> Vec<HealthCheck> {
        let mut checks = vec![
            self.check_configuration(),
            self.check_api_key(),
            Self::check_aws_credentials(client),
            self.check_knowledge_base(),
        ];

        for endpoint in client.check_reachability().await {
            checks.push(Self::check_endpoint(&endpoint));
        }

        checks.push(self.check_state_dir());
        checks
    }

    /// Check 1: configuration values are in range
    fn check_configuration(&self) -> HealthCheck {
        match self.config.validate() {
            Ok(()) => HealthCheck::new("Configuration", HealthStatus::Pass),
            Err(e) => HealthCheck::new("Configuration", HealthStatus::Fail(e.to_string())),
        }
    }

    /// Check 2: API key available
    fn check_api_key(&self) -> HealthCheck {
        if self.api_key_present {
            HealthCheck::new("API Key", HealthStatus::Pass)
        } else {
            HealthCheck::new(
                "API Key",
                HealthStatus::Warn(format!("{} is not set", self.config.bedrock.api_key_env)),
            )
        }
    }

    /// Check 3: SigV4 credentials resolved for knowledge-base retrieval
    fn check_aws_credentials(client: &BedrockClient) -> HealthCheck {
        if client.has_signer() {
            HealthCheck::new("AWS Credentials", HealthStatus::Pass)
        } else {
            HealthCheck::new(
                "AWS Credentials",
                HealthStatus::Warn("none found; retrieval requests are unsigned".to_string()),
            )
        }
    }

    /// Check 4: knowledge base configured
    fn check_knowledge_base(&self) -> HealthCheck {
        if self.config.chat.knowledge_base_id.trim().is_empty() {
            HealthCheck::new(
                "Knowledge Base",
                HealthStatus::Fail("no knowledge base id configured".to_string()),
            )
        } else {
            HealthCheck::new("Knowledge Base", HealthStatus::Pass)
        }
    }

    /// Checks 5 and 6: endpoint reachability
    fn check_endpoint(endpoint: &EndpointStatus) -> HealthCheck {
        let status = if endpoint.reachable {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail(format!("{} unreachable: {}", endpoint.url, endpoint.detail))
        };
        HealthCheck::new(endpoint.name, status)
    }

    /// Check 7: state directory writable
    fn check_state_dir(&self) -> HealthCheck {
        Self::check_writable(&self.config.state_dir())
    }

    fn check_writable(dir: &Path) -> HealthCheck {
        if let Err(e) = std::fs::create_dir_all(dir) {
            return HealthCheck::new(
                "State Directory",
                HealthStatus::Fail(format!("cannot create {}: {}", dir.display(), e)),
            );
        }

        let marker = dir.join(".bedrock_chat_write_test");
        match std::fs::write(&marker, "ok") {
            Ok(()) => {
                let _ = std::fs::remove_file(&marker);
                HealthCheck::new("State Directory", HealthStatus::Pass)
            }
            Err(_) => HealthCheck::new(
                "State Directory",
                HealthStatus::Fail(format!("no write permission in {}", dir.display())),
            ),
        }
    }

    /// Display diagnostics results
    pub fn display_results(checks: &[HealthCheck]) {
        println!("\nbedrock-chat diagnostics\n");
        println!("{:<24} Status", "Check");
        println!("{}", "=".repeat(56));

        for check in checks {
            let message = match &check.status {
                HealthStatus::Pass => "PASS".green().to_string(),
                HealthStatus::Warn(msg) => format!("WARN: {}", msg).yellow().to_string(),
                HealthStatus::Fail(msg) => format!("FAIL: {}", msg).red().to_string(),
            };
            println!("{:<24} {}", check.name, message);
        }

        println!();
    }

    /// Get overall health status
    pub fn overall_status(checks: &[HealthCheck]) -> bool {
        !checks.iter().any(|c| matches!(c.status, HealthStatus::Fail(_)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bedrock::SigV4Signer;
    use aws_credential_types::provider::SharedCredentialsProvider;
    use aws_credential_types::Credentials;
    use tempfile::TempDir;

    #[test]
    fn test_health_status_equality() {
        assert_eq!(HealthStatus::Pass, HealthStatus::Pass);
        assert_eq!(
            HealthStatus::Warn("test".to_string()),
            HealthStatus::Warn("test".to_string())
        );
        assert_ne!(HealthStatus::Pass, HealthStatus::Fail("x".to_string()));
    }

    #[test]
    fn test_overall_status_pass() {
        let checks = vec![
            HealthCheck::new("Test 1", HealthStatus::Pass),
            HealthCheck::new("Test 2", HealthStatus::Warn("warning".to_string())),
        ];
        assert!(Doctor::overall_status(&checks));
    }

    #[test]
    fn test_overall_status_fail() {
        let checks = vec![
            HealthCheck::new("Test 1", HealthStatus::Pass),
            HealthCheck::new("Test 2", HealthStatus::Fail("error".to_string())),
        ];
        assert!(!Doctor::overall_status(&checks));
    }

    #[test]
    fn test_missing_knowledge_base_fails() {
        let doctor = Doctor::new(Config::default());
        assert!(matches!(doctor.check_knowledge_base().status, HealthStatus::Fail(_)));

        let mut config = Config::default();
        config.chat.knowledge_base_id = "KB123".to_string();
        let doctor = Doctor::new(config);
        assert_eq!(doctor.check_knowledge_base().status, HealthStatus::Pass);
    }

    #[test]
    fn test_unreachable_endpoint_fails() {
        let check = Doctor::check_endpoint(&EndpointStatus {
            name: "bedrock-runtime",
            url: "http://127.0.0.1:9".to_string(),
            reachable: false,
            detail: "connection refused".to_string(),
        });
        assert_eq!(check.name, "bedrock-runtime");
        assert!(matches!(
            check.status,
            HealthStatus::Fail(ref msg) if msg.contains("connection refused")
        ));
    }

    #[test]
    fn test_aws_credentials_check() {
        let client = BedrockClient::with_endpoints(
            "http://127.0.0.1:9",
            "http://127.0.0.1:9",
            Some("key".to_string()),
            None,
        )
        .unwrap();
        assert!(matches!(
            Doctor::check_aws_credentials(&client).status,
            HealthStatus::Warn(_)
        ));

        let credentials = Credentials::new("AKIDEXAMPLE", "secret", None, None, "unit-test");
        let signer = SigV4Signer::new(SharedCredentialsProvider::new(credentials), "us-west-2");
        let client = client.with_signer(signer);
        assert_eq!(Doctor::check_aws_credentials(&client).status, HealthStatus::Pass);
    }

    #[test]
    fn test_state_dir_writable() {
        let dir = TempDir::new().unwrap();
        let check = Doctor::check_writable(&dir.path().join("state"));
        assert_eq!(check.status, HealthStatus::Pass);
    }
}
