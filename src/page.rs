// HTML rendering of the estimation form with Askama

use askama::Template;
use std::collections::HashMap;

use crate::error::EstimatorError;
use crate::report::Report;
use crate::types::{Feature, LoadType, WeekStatus};

pub struct InputView {
    pub name: &'static str,
    pub label: &'static str,
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub value: String,
}

pub struct OptionView {
    pub value: &'static str,
    pub selected: bool,
}

pub struct SelectView {
    pub name: &'static str,
    pub label: &'static str,
    pub options: Vec<OptionView>,
}

pub struct Notice {
    pub level: &'static str,
    pub headline: String,
    pub lines: Vec<String>,
}

impl Notice {
    pub fn report(report: &Report) -> Self {
        Self {
            level: "success",
            headline: report.headline(),
            lines: report.commentary(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: "warning",
            headline: message.into(),
            lines: Vec::new(),
        }
    }

    pub fn error(err: &EstimatorError) -> Self {
        Self {
            level: "error",
            headline: err.to_string(),
            lines: Vec::new(),
        }
    }
}

#[derive(Template)]
#[template(path = "form.html")]
pub struct FormPage {
    pub title: String,
    pub inputs: Vec<InputView>,
    pub selects: Vec<SelectView>,
    pub notice: Option<Notice>,
}

impl FormPage {
    /// Lays out one control per schema feature, echoing `submitted` values
    /// (keyed by canonical feature name).
    pub fn new(title: &str, schema: &[Feature], submitted: &HashMap<Feature, String>) -> Self {
        let mut inputs = Vec::new();
        let mut selects = Vec::new();

        for &feature in schema {
            let current = submitted.get(&feature).map(|s| s.trim()).unwrap_or("");
            if feature.is_categorical() {
                let names: Vec<&'static str> = match feature {
                    Feature::WeekStatus => WeekStatus::ALL.iter().map(|s| s.as_str()).collect(),
                    _ => LoadType::ALL.iter().map(|t| t.as_str()).collect(),
                };
                let chosen = if names.iter().any(|n| *n == current) {
                    current
                } else {
                    names[0]
                };
                selects.push(SelectView {
                    name: feature.name(),
                    label: feature.label(),
                    options: names
                        .into_iter()
                        .map(|value| OptionView {
                            value,
                            selected: value == chosen,
                        })
                        .collect(),
                });
            } else {
                inputs.push(InputView {
                    name: feature.name(),
                    label: feature.label(),
                    min: feature.min(),
                    max: feature.max(),
                    step: feature.step(),
                    value: current.to_string(),
                });
            }
        }

        Self {
            title: title.to_string(),
            inputs,
            selects,
            notice: None,
        }
    }

    pub fn with_notice(mut self, notice: Notice) -> Self {
        self.notice = Some(notice);
        self
    }

    pub fn to_html(&self) -> String {
        self.render()
            .unwrap_or_else(|e| format!("Template error: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_controls_for_schema_only() {
        let schema = [Feature::UsageKwh, Feature::Nsm, Feature::LoadType];
        let mut submitted = HashMap::new();
        submitted.insert(Feature::LoadType, "Medium".to_string());
        submitted.insert(Feature::UsageKwh, "3.5".to_string());

        let html = FormPage::new("CO2", &schema, &submitted).to_html();
        assert!(html.contains(r#"name="Usage_kWh""#));
        assert!(html.contains(r#"value="3.5""#));
        assert!(html.contains(r#"max="86400""#));
        assert!(html.contains(r#"<option value="Medium" selected>"#));
        assert!(!html.contains("WeekStatus"));
        assert!(!html.contains("Day_sin"));
    }

    #[test]
    fn notices_are_escaped() {
        let err = EstimatorError::InvalidCategory {
            field: "Load_Type",
            value: "<script>".into(),
        };
        let html = FormPage::new("CO2", &[Feature::LoadType], &HashMap::new())
            .with_notice(Notice::error(&err))
            .to_html();
        assert!(html.contains("notice error"));
        assert!(!html.contains("<script>"));
    }
}
