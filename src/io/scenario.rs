//! Scripted operator scenarios for headless runs
//!
//! A scenario is a list of `seconds:command` steps, e.g.
//! `10:wear,20:jam,30:normal,40:quit`, or the name of a built-in scenario.
//! Steps are sorted by time and each one is handed out exactly once.

use crate::domain::types::{Command, Regime};
use anyhow::{bail, Context};

/// One scripted command at a simulation time
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioStep {
    pub at_secs: f64,
    pub command: Command,
}

const DEMO: &[ScenarioStep] = &[
    ScenarioStep { at_secs: 15.0, command: Command::SetRegime(Regime::Wear) },
    ScenarioStep { at_secs: 30.0, command: Command::SetRegime(Regime::Jam) },
    ScenarioStep { at_secs: 45.0, command: Command::SetRegime(Regime::Normal) },
    ScenarioStep { at_secs: 60.0, command: Command::Quit },
];

fn builtin(name: &str) -> Option<&'static [ScenarioStep]> {
    match name {
        "demo" => Some(DEMO),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct Scenario {
    name: String,
    steps: Vec<ScenarioStep>,
    cursor: usize,
}

impl Scenario {
    /// Parse a built-in name or a comma-separated `seconds:command` list
    pub fn parse(input: &str) -> anyhow::Result<Self> {
        let input = input.trim();
        if let Some(steps) = builtin(input) {
            return Ok(Self { name: input.to_string(), steps: steps.to_vec(), cursor: 0 });
        }

        let mut steps = Vec::new();
        for part in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (at, cmd) = part
                .split_once(':')
                .with_context(|| format!("scenario step '{}' is not 'seconds:command'", part))?;
            let at_secs: f64 = at
                .trim()
                .parse()
                .with_context(|| format!("invalid time '{}' in scenario step '{}'", at, part))?;
            if !at_secs.is_finite() || at_secs < 0.0 {
                bail!("scenario time must be a non-negative number, got '{}'", at);
            }
            let command: Command = cmd.parse()?;
            steps.push(ScenarioStep { at_secs, command });
        }

        if steps.is_empty() {
            bail!("scenario '{}' has no steps", input);
        }

        steps.sort_by(|a, b| a.at_secs.total_cmp(&b.at_secs));
        Ok(Self { name: "custom".to_string(), steps, cursor: 0 })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// True once every step has been handed out
    pub fn is_finished(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    /// Commands whose time has come, in order; each step is returned once
    pub fn due(&mut self, elapsed_secs: f64) -> Vec<Command> {
        let mut due = Vec::new();
        while let Some(step) = self.steps.get(self.cursor) {
            if step.at_secs > elapsed_secs {
                break;
            }
            due.push(step.command);
            self.cursor += 1;
        }
        due
    }
}
