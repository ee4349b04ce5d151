//! Automated scan pipeline and continuous scan hook.

pub struct ScanTarget {
    pub service_url: String,
}

pub struct ScanResult {
    pub passed: bool,
    pub findings: Vec<String>,
}

/// Simulated automated scan pipeline that hooks into CI/CD.
pub struct AutomatedScanner;

impl AutomatedScanner {
    /// Entrypoint for continuous scan hook.
    pub fn run_continuous_scan(target: &ScanTarget) -> ScanResult {
        // In reality, this would trigger fuzzers, mutate testing, and dependency checks.
        let mut findings = vec![];
        
        if target.service_url.is_empty() {
            findings.push("Service URL is empty".to_string());
        }

        ScanResult {
            passed: findings.is_empty(),
            findings,
        }
    }
}

pub struct ExploitReproducer;

impl ExploitReproducer {
    /// Simulated exploit reproduction script runner.
    pub fn verify_mitigation(exploit_id: &str) -> bool {
        // Mock returning true to indicate mitigation is successful
        !exploit_id.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_continuous_scan_hook() {
        let target = ScanTarget { service_url: "http://localhost:8080".to_string() };
        let result = AutomatedScanner::run_continuous_scan(&target);
        assert!(result.passed);
        
        assert!(ExploitReproducer::verify_mitigation("CVE-2026-1234"));
    }
}
