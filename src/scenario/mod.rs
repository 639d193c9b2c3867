// Scripted UI scenarios run against the web app once the environment is up

pub mod page;
pub mod rights;
pub mod session;

use crate::errors::{HarnessError, Result};
use session::Session;
use std::fmt;

/// One interaction or check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Load a path relative to the base URL
    Visit(String),
    /// Fill the current form and submit it
    Submit(Vec<(String, String)>),
    /// The visible page text must contain this
    ExpectText(String),
    /// A submit control with these classes must be present
    ExpectButton(String),
    /// Follow the nth (1-based) link containing `text`
    FollowLink { text: String, nth: usize },
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Visit(path) => write!(f, "visit {}", path),
            Step::Submit(fields) => {
                let names: Vec<&str> = fields.iter().map(|(name, _)| name.as_str()).collect();
                write!(f, "submit [{}]", names.join(", "))
            }
            Step::ExpectText(text) => write!(f, "expect text \"{}\"", text),
            Step::ExpectButton(classes) => write!(f, "expect button .{}", classes.replace(' ', ".")),
            Step::FollowLink { text, nth } => write!(f, "follow link \"{}\" #{}", text, nth),
        }
    }
}

impl Step {
    pub fn execute(&self, session: &mut Session) -> Result<()> {
        match self {
            Step::Visit(path) => {
                session.open(path)?;
            }
            Step::Submit(fields) => {
                session.submit_form(fields)?;
            }
            Step::ExpectText(text) => {
                let page = session.page()?;
                if !page.contains_text(text) {
                    return Err(HarnessError::AssertionFailed(format!(
                        "{} does not contain \"{}\"",
                        page.url, text
                    )));
                }
            }
            Step::ExpectButton(classes) => {
                let page = session.page()?;
                if !page.has_button(classes) {
                    return Err(HarnessError::AssertionFailed(format!(
                        "{} has no button with class \"{}\"",
                        page.url, classes
                    )));
                }
            }
            Step::FollowLink { text, nth } => {
                session.follow_link(text, *nth)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub steps: Vec<Step>,
}

impl Scenario {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            steps: Vec::new(),
        }
    }

    pub fn visit(mut self, path: &str) -> Self {
        self.steps.push(Step::Visit(path.to_string()));
        self
    }

    pub fn submit(mut self, fields: &[(&str, &str)]) -> Self {
        let fields = fields
            .iter()
            .map(|(name, value)| (name.to_string(), value.to_string()))
            .collect();
        self.steps.push(Step::Submit(fields));
        self
    }

    pub fn expect_text(mut self, text: &str) -> Self {
        self.steps.push(Step::ExpectText(text.to_string()));
        self
    }

    pub fn expect_button(mut self, classes: &str) -> Self {
        self.steps.push(Step::ExpectButton(classes.to_string()));
        self
    }

    pub fn follow_link(mut self, text: &str, nth: usize) -> Self {
        self.steps.push(Step::FollowLink {
            text: text.to_string(),
            nth,
        });
        self
    }

    /// Run every step in order, stopping at the first failure
    pub fn run(&self, session: &mut Session) -> ScenarioReport {
        tracing::info!(scenario = %self.name, steps = self.steps.len(), "Running scenario");

        for (index, step) in self.steps.iter().enumerate() {
            tracing::debug!(scenario = %self.name, step = index + 1, "{}", step);
            if let Err(e) = step.execute(session) {
                tracing::warn!(scenario = %self.name, step = index + 1, error = %e, "Step failed");
                return ScenarioReport {
                    scenario: self.name.clone(),
                    total: self.steps.len(),
                    passed: index,
                    failure: Some(StepFailure {
                        index,
                        step: step.to_string(),
                        error: e.to_string(),
                    }),
                };
            }
        }

        ScenarioReport {
            scenario: self.name.clone(),
            total: self.steps.len(),
            passed: self.steps.len(),
            failure: None,
        }
    }

    /// Open a fresh session on `base_url` and run
    pub fn run_against(&self, base_url: &str) -> Result<ScenarioReport> {
        let mut session = Session::new(base_url)?;
        Ok(self.run(&mut session))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFailure {
    /// 0-based position in the scenario
    pub index: usize,
    pub step: String,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScenarioReport {
    pub scenario: String,
    pub total: usize,
    pub passed: usize,
    pub failure: Option<StepFailure>,
}

impl ScenarioReport {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    pub fn into_result(self) -> Result<()> {
        match self.failure {
            None => Ok(()),
            Some(failure) => Err(HarnessError::AssertionFailed(format!(
                "scenario '{}' failed at step {} ({}): {}",
                self.scenario,
                failure.index + 1,
                failure.step,
                failure.error
            ))),
        }
    }
}

/// Look up a built-in scenario by name
pub fn builtin(name: &str) -> Option<Scenario> {
    match name {
        rights::ACCESS_RIGHTS => Some(rights::access_rights()),
        _ => None,
    }
}

pub fn builtin_names() -> &'static [&'static str] {
    &[rights::ACCESS_RIGHTS]
}
