//! Prompt transport
//!
//! The session controller talks to the operator exclusively through the
//! `Prompt` trait. `ScriptedPrompt` feeds canned answers for tests and
//! non-interactive runs; the `cli` feature adds a rustyline-backed
//! implementation for real terminals.

#[cfg(feature = "cli")]
pub mod readline;

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{DesignerError, DesignerResult};

#[cfg(feature = "cli")]
pub use readline::ReadlinePrompt;

/// One question/answer transport. Empty input means "no answer": `ask`
/// returns `None`, the defaulted variants fall back to their default.
#[async_trait]
pub trait Prompt: Send + Sync {
    /// Free-text question, no default.
    async fn ask(&self, question: &str) -> DesignerResult<Option<String>>;

    /// Free-text question with a default used on empty input.
    async fn ask_default(&self, question: &str, default: &str) -> DesignerResult<String>;

    /// Yes/no question.
    async fn confirm(&self, question: &str, default: bool) -> DesignerResult<bool>;

    /// Pick one of `options`. Empty input selects `default` when given.
    async fn choice(
        &self,
        question: &str,
        options: &[String],
        default: Option<&str>,
    ) -> DesignerResult<String>;

    fn info(&self, message: &str);
    fn warn(&self, message: &str);
}

// ============================================================================
// Scripted transport
// ============================================================================

/// Replays a fixed list of answers. An empty string stands for "just press
/// enter". Running out of answers is an error so a test that under-scripts
/// fails loudly instead of hanging.
pub struct ScriptedPrompt {
    answers: Mutex<VecDeque<String>>,
    questions: Mutex<Vec<String>>,
    messages: Mutex<Vec<String>>,
}

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: Mutex::new(answers.into_iter().map(Into::into).collect()),
            questions: Mutex::new(Vec::new()),
            messages: Mutex::new(Vec::new()),
        }
    }

    /// Queue more answers after construction, for multi-phase scripts.
    pub fn push_answers<I, S>(&self, answers: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut queue = self.answers.lock().unwrap();
        queue.extend(answers.into_iter().map(Into::into));
    }

    pub fn remaining(&self) -> usize {
        self.answers.lock().unwrap().len()
    }

    /// Every question asked so far, in order.
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }

    /// Every info/warn line emitted so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    fn next_answer(&self, question: &str) -> DesignerResult<String> {
        self.questions.lock().unwrap().push(question.to_string());
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| DesignerError::prompt(format!("script exhausted at: {question}")))
    }
}

#[async_trait]
impl Prompt for ScriptedPrompt {
    async fn ask(&self, question: &str) -> DesignerResult<Option<String>> {
        let answer = self.next_answer(question)?;
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(answer))
        }
    }

    async fn ask_default(&self, question: &str, default: &str) -> DesignerResult<String> {
        let answer = self.next_answer(question)?;
        if answer.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(answer)
        }
    }

    async fn confirm(&self, question: &str, default: bool) -> DesignerResult<bool> {
        let answer = self.next_answer(question)?;
        if answer.is_empty() {
            return Ok(default);
        }
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes" | "true"))
    }

    async fn choice(
        &self,
        question: &str,
        options: &[String],
        default: Option<&str>,
    ) -> DesignerResult<String> {
        let answer = self.next_answer(question)?;
        if answer.is_empty() {
            return default
                .map(str::to_string)
                .ok_or_else(|| DesignerError::prompt(format!("no default for: {question}")));
        }
        if !options.iter().any(|option| option == &answer) {
            return Err(DesignerError::prompt(format!(
                "scripted answer '{answer}' is not an option for: {question}"
            )));
        }
        Ok(answer)
    }

    fn info(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }

    fn warn(&self, message: &str) {
        self.messages
            .lock()
            .unwrap()
            .push(format!("warning: {message}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_answer_uses_default() {
        let prompt = ScriptedPrompt::new(["", "", ""]);
        assert_eq!(prompt.ask("name?").await.unwrap(), None);
        assert_eq!(prompt.ask_default("table?", "books").await.unwrap(), "books");
        assert!(prompt.confirm("sure?", true).await.unwrap());
    }

    #[tokio::test]
    async fn test_choice_validates_scripted_answer() {
        let prompt = ScriptedPrompt::new(["text", "ghost"]);
        let options = vec!["text".to_string(), "number".to_string()];

        let picked = prompt.choice("uitype?", &options, None).await.unwrap();
        assert_eq!(picked, "text");

        let err = prompt.choice("uitype?", &options, None).await.unwrap_err();
        assert!(matches!(err, DesignerError::Prompt { .. }));
    }

    #[tokio::test]
    async fn test_exhausted_script_errors() {
        let prompt = ScriptedPrompt::new(Vec::<String>::new());
        let err = prompt.ask("anything?").await.unwrap_err();
        assert!(matches!(err, DesignerError::Prompt { .. }));
    }
}
