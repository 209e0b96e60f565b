//! Cross-resolver comparison of batch results
//!
//! Successful answers are grouped by their value set (sorted, TTL ignored,
//! since TTLs count down independently on every cache). The consistency
//! percentage is the share of successful servers that agree with the most
//! common answer.

use serde::Serialize;
use std::collections::HashMap;

use dnswatch_core::types::DnsQuery;

/// Servers that returned the same answer set
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnswerGroup {
    /// Sorted answer values
    pub values: Vec<String>,
    /// ISP names (or server addresses when unnamed), in input order
    pub servers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// 0.0 when nothing succeeded
    pub consistency_percentage: f64,
    /// Largest group first
    pub answers: Vec<AnswerGroup>,
}

impl ComparisonSummary {
    pub fn from_queries(queries: &[DnsQuery]) -> Self {
        let mut groups: Vec<AnswerGroup> = Vec::new();
        let mut index: HashMap<Vec<String>, usize> = HashMap::new();
        let mut succeeded = 0;

        for query in queries {
            let Some(result) = query.result().filter(|r| r.is_success()) else {
                continue;
            };
            succeeded += 1;

            let mut values: Vec<String> = result.records().iter().map(|r| r.value.clone()).collect();
            values.sort();

            let label = query
                .isp_name()
                .map(str::to_string)
                .unwrap_or_else(|| query.server().to_string());

            match index.get(&values) {
                Some(&i) => groups[i].servers.push(label),
                None => {
                    index.insert(values.clone(), groups.len());
                    groups.push(AnswerGroup {
                        values,
                        servers: vec![label],
                    });
                }
            }
        }

        // Stable: ties keep first-seen order
        groups.sort_by(|a, b| b.servers.len().cmp(&a.servers.len()));

        let consistency_percentage = match groups.first() {
            Some(top) if succeeded > 0 => top.servers.len() as f64 / succeeded as f64 * 100.0,
            _ => 0.0,
        };

        Self {
            total: queries.len(),
            succeeded,
            failed: queries.len() - succeeded,
            consistency_percentage,
            answers: groups,
        }
    }

    /// All successful servers agree
    pub fn is_consistent(&self) -> bool {
        self.succeeded > 0 && self.answers.len() == 1
    }
}
