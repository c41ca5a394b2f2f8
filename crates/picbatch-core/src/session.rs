//! Chaining stages within one editing session.
//!
//! A [`PipelineSession`] is an explicit value owned by the caller. After a
//! batch finishes, [`PipelineSession::complete_stage`] replaces the current
//! image set with that batch's outputs; the caller then picks the next step
//! from [`PipelineSession::available_next_steps`].
//!
//! # Stage Transitions
//!
//! ```text
//! (start)   -> crop | watermark
//! crop      -> watermark | done
//! watermark -> crop | done
//! done      -> (inert)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{ImageAsset, ProcessedAsset, Stage};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("The session is finished")]
    Finished,

    #[error("A stage must produce at least one image before the session can advance")]
    NoOutputs,

    #[error("Cannot go to {step} after {}", .last.map_or("start", Stage::as_str))]
    StepUnavailable { step: NextStep, last: Option<Stage> },

    #[error("Unknown step: {0}")]
    UnknownStep(String),

    #[error("Cannot complete {stage} while {active} is active")]
    StageNotActive { stage: Stage, active: Stage },
}

/// What the user can do after a stage completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextStep {
    Crop,
    Watermark,
    Done,
}

impl NextStep {
    /// The stage this step enters, or `None` for `Done`.
    pub fn stage(self) -> Option<Stage> {
        match self {
            NextStep::Crop => Some(Stage::Crop),
            NextStep::Watermark => Some(Stage::Watermark),
            NextStep::Done => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NextStep::Crop => "crop",
            NextStep::Watermark => "watermark",
            NextStep::Done => "done",
        }
    }
}

impl From<Stage> for NextStep {
    fn from(stage: Stage) -> Self {
        match stage {
            Stage::Crop => NextStep::Crop,
            Stage::Watermark => NextStep::Watermark,
        }
    }
}

impl std::fmt::Display for NextStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for NextStep {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "done" => Ok(NextStep::Done),
            other => other.parse::<Stage>().map(NextStep::from),
        }
    }
}

/// Steps offered after `last` completed.
///
/// The completed stage is never offered again directly; `done` is offered
/// once any stage has run.
pub fn available_next_steps(last: Option<Stage>) -> Vec<NextStep> {
    match last {
        None => vec![NextStep::Crop, NextStep::Watermark],
        Some(stage) => vec![stage.complement().into(), NextStep::Done],
    }
}

/// Image set and stage history of one editing session.
#[derive(Debug, Clone, Default)]
pub struct PipelineSession {
    images: Vec<ImageAsset>,
    last_stage: Option<Stage>,
    active_stage: Option<Stage>,
    finished: bool,
}

impl PipelineSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Images the active stage will process.
    pub fn current_images(&self) -> &[ImageAsset] {
        &self.images
    }

    pub fn last_stage(&self) -> Option<Stage> {
        self.last_stage
    }

    /// The tool currently selected, if any.
    pub fn active_stage(&self) -> Option<Stage> {
        self.active_stage
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Replace the current image set with freshly picked or dropped files.
    pub fn ingest(&mut self, images: Vec<ImageAsset>) -> Result<(), SessionError> {
        self.ensure_active()?;
        tracing::debug!(count = images.len(), "Images ingested");
        self.images = images;
        Ok(())
    }

    /// Switch tools without completing a stage.
    pub fn select_stage(&mut self, stage: Stage) -> Result<(), SessionError> {
        self.ensure_active()?;
        self.active_stage = Some(stage);
        Ok(())
    }

    /// Record a finished batch and carry its outputs forward.
    ///
    /// The outputs become the new image set, keeping their names. The
    /// session is left unchanged when there are no outputs or when another
    /// tool is active.
    pub fn complete_stage(
        &mut self,
        stage: Stage,
        outputs: &[ProcessedAsset],
    ) -> Result<(), SessionError> {
        self.ensure_active()?;
        if let Some(active) = self.active_stage.filter(|&active| active != stage) {
            return Err(SessionError::StageNotActive { stage, active });
        }
        if outputs.is_empty() {
            return Err(SessionError::NoOutputs);
        }

        self.images = outputs.iter().cloned().map(ImageAsset::from).collect();
        self.last_stage = Some(stage);
        tracing::info!(stage = %stage, images = self.images.len(), "Stage completed");
        Ok(())
    }

    /// Steps the caller may choose now. Empty once the session is finished.
    pub fn available_next_steps(&self) -> Vec<NextStep> {
        if self.finished {
            return Vec::new();
        }
        available_next_steps(self.last_stage)
    }

    /// Act on the caller's choice.
    ///
    /// Choosing a stage makes it active and returns the current image set as
    /// that stage's input. Choosing `done` finishes the session and returns
    /// `None`.
    pub fn choose(&mut self, step: NextStep) -> Result<Option<Vec<ImageAsset>>, SessionError> {
        self.ensure_active()?;
        if !available_next_steps(self.last_stage).contains(&step) {
            return Err(SessionError::StepUnavailable {
                step,
                last: self.last_stage,
            });
        }

        match step.stage() {
            Some(stage) => {
                self.active_stage = Some(stage);
                tracing::debug!(stage = %stage, images = self.images.len(), "Handing images to next stage");
                Ok(Some(self.images.clone()))
            }
            None => {
                self.finished = true;
                self.active_stage = None;
                tracing::debug!("Session finished");
                Ok(None)
            }
        }
    }

    fn ensure_active(&self) -> Result<(), SessionError> {
        if self.finished {
            Err(SessionError::Finished)
        } else {
            Ok(())
        }
    }
}
