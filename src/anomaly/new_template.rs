// LogSleuth - anomaly/new_template.rs
//
// New-template surge strategy (§4.H.3): fraction of all known templates
// that were first seen inside the current window.

use super::detector::{AnomalyStrategy, DetectionContext};
use crate::core::model::{Anomaly, AnomalyKind, AnomalySeverity};
use crate::util::constants::{NEW_TEMPLATE_SURGE_HIGH_RATIO, NEW_TEMPLATE_SURGE_RATIO};
use crate::util::error::AnomalyError;
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;

pub struct NewTemplateStrategy;

#[async_trait]
impl AnomalyStrategy for NewTemplateStrategy {
    fn name(&self) -> &'static str {
        "new_template_surge"
    }

    async fn run(&self, ctx: &DetectionContext) -> Result<Vec<Anomaly>, AnomalyError> {
        let templates = ctx
            .storage
            .list_templates()
            .await
            .map_err(|source| AnomalyError::WindowUnavailable {
                strategy: self.name(),
                source,
            })?;

        if templates.is_empty() {
            return Ok(Vec::new());
        }

        let new_templates: Vec<_> = templates
            .iter()
            .filter(|t| t.first_seen >= ctx.window_start && t.first_seen <= ctx.window_end)
            .collect();

        let ratio = new_templates.len() as f64 / templates.len() as f64;
        if ratio <= NEW_TEMPLATE_SURGE_RATIO {
            return Ok(Vec::new());
        }

        let severity = if ratio > NEW_TEMPLATE_SURGE_HIGH_RATIO {
            AnomalySeverity::High
        } else {
            AnomalySeverity::Medium
        };

        let log_count: u64 = new_templates.iter().map(|t| t.count).sum();

        let mut details = HashMap::new();
        details.insert("ratio".to_string(), serde_json::json!(ratio));
        details.insert("total_templates".to_string(), serde_json::json!(templates.len()));

        Ok(vec![Anomaly {
            id: None,
            event_time: ctx.window_end,
            kind: AnomalyKind::NewTemplateSurge,
            severity,
            description: format!(
                "{} of {} known templates ({:.1}%) first appeared in this window",
                new_templates.len(),
                templates.len(),
                ratio * 100.0
            ),
            affected_templates: new_templates.iter().map(|t| t.template_id.clone()).collect(),
            log_count,
            score: ratio,
            details,
            created_at: Utc::now(),
        }])
    }
}
