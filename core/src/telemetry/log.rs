use crate::detection::STAMP_FORMAT;
use crate::prelude::PipelineError;
use chrono::{DateTime, Local};
use log::{info, warn};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStage {
    Idle,
    Recording,
    Detecting,
    Deciding,
    Alerting,
    Uploading,
}

impl CycleStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            CycleStage::Idle => "idle",
            CycleStage::Recording => "recording",
            CycleStage::Detecting => "detecting",
            CycleStage::Deciding => "deciding",
            CycleStage::Alerting => "alerting",
            CycleStage::Uploading => "uploading",
        }
    }
}

impl fmt::Display for CycleStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prefixes every line of one cycle with `cycle=<stamp> stage=<stage>`.
///
/// The stamp uses the segment file layout, so a cycle started at `started`
/// records `detection_<stamp>.*`.
pub struct CycleLog {
    cycle: String,
    started: DateTime<Local>,
}

impl CycleLog {
    pub fn starting_at(started: DateTime<Local>) -> Self {
        Self {
            cycle: started.format(STAMP_FORMAT).to_string(),
            started,
        }
    }

    pub fn starting_now() -> Self {
        Self::starting_at(Local::now())
    }

    pub fn cycle(&self) -> &str {
        &self.cycle
    }

    pub fn started(&self) -> DateTime<Local> {
        self.started
    }

    pub fn line(&self, stage: CycleStage, message: &str) -> String {
        format!("cycle={} stage={} {}", self.cycle, stage, message)
    }

    pub fn failure_line(&self, stage: CycleStage, error: &PipelineError) -> String {
        format!(
            "cycle={} stage={} kind={} {}",
            self.cycle,
            stage,
            error.kind(),
            error
        )
    }

    pub fn info(&self, stage: CycleStage, message: &str) {
        info!("{}", self.line(stage, message));
    }

    pub fn warn(&self, stage: CycleStage, message: &str) {
        warn!("{}", self.line(stage, message));
    }

    pub fn failure(&self, stage: CycleStage, error: &PipelineError) {
        warn!("{}", self.failure_line(stage, error));
    }
}
