//! Outcome of a registration or deregistration.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::SideEffectFailure;

/// What a lifecycle transition did besides changing the module set.
///
/// The transition itself always succeeded when a report exists; `failures`
/// lists the side effects that did not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleReport {
    pub module: String,
    /// Migration paths run (or rolled back) successfully.
    pub migrations: Vec<String>,
    pub permissions_created: Vec<String>,
    pub permissions_deleted: Vec<String>,
    pub failures: Vec<SideEffectFailure>,
}

impl LifecycleReport {
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            ..Self::default()
        }
    }

    /// True when every side effect succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Event context map describing this report.
    pub fn context(&self) -> HashMap<String, serde_json::Value> {
        let mut ctx = HashMap::new();
        if !self.migrations.is_empty() {
            ctx.insert("migrations".to_string(), serde_json::json!(self.migrations));
        }
        if !self.permissions_created.is_empty() {
            ctx.insert(
                "permissions_created".to_string(),
                serde_json::json!(self.permissions_created),
            );
        }
        if !self.permissions_deleted.is_empty() {
            ctx.insert(
                "permissions_deleted".to_string(),
                serde_json::json!(self.permissions_deleted),
            );
        }
        if !self.failures.is_empty() {
            ctx.insert("failures".to_string(), serde_json::json!(self.failures));
        }
        ctx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SideEffect;

    #[test]
    fn clean_report_has_empty_context() {
        let report = LifecycleReport::new("blog");
        assert!(report.is_clean());
        assert!(report.context().is_empty());
    }

    #[test]
    fn failures_show_up_in_context() {
        let mut report = LifecycleReport::new("blog");
        report.failures.push(SideEffectFailure::new(
            "blog",
            SideEffect::MigrationRun,
            "db/blog",
            &anyhow::anyhow!("connection refused"),
        ));

        assert!(!report.is_clean());
        let ctx = report.context();
        assert_eq!(ctx["failures"][0]["operation"], "migration_run");
        assert_eq!(ctx["failures"][0]["details"], "connection refused");
    }
}
