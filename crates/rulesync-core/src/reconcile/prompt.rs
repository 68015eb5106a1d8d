//! The interactive-choice capability injected into the reconciler

use std::collections::VecDeque;

use crate::{Error, Result};

/// Asks the user to pick one of `options`.
///
/// Implementations return the index of the chosen option. Calls are strictly
/// sequential and block the pass until answered.
pub trait Prompter {
    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize>;
}

/// A prompter answering from a fixed queue, recording every question.
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompter {
    answers: VecDeque<usize>,
    asked: Vec<(String, Vec<String>)>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = usize>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Every prompt shown so far with its options.
    pub fn asked(&self) -> &[(String, Vec<String>)] {
        &self.asked
    }
}

impl Prompter for ScriptedPrompter {
    fn select(&mut self, prompt: &str, options: &[String]) -> Result<usize> {
        self.asked.push((prompt.to_string(), options.to_vec()));
        let answer = self.answers.pop_front().ok_or_else(|| Error::Prompt {
            message: format!("no scripted answer left for: {prompt}"),
        })?;
        if answer >= options.len() {
            return Err(Error::Prompt {
                message: format!(
                    "scripted answer {answer} out of range for {} options",
                    options.len()
                ),
            });
        }
        Ok(answer)
    }
}

/// A prompter for runs that must never ask; any question is an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn select(&mut self, prompt: &str, _options: &[String]) -> Result<usize> {
        Err(Error::Prompt {
            message: format!("interactive input required but unavailable: {prompt}"),
        })
    }
}
