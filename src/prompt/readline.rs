//! Terminal prompt backed by rustyline
//!
//! Questions print above a `>` line editor with history. Color is dropped
//! automatically when stdout is not a terminal.

use std::sync::Mutex;

use async_trait::async_trait;
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::error::{DesignerError, DesignerResult};
use crate::prompt::Prompt;

pub struct ReadlinePrompt {
    editor: Mutex<DefaultEditor>,
}

impl ReadlinePrompt {
    pub fn new() -> DesignerResult<Self> {
        if !atty::is(atty::Stream::Stdout) {
            colored::control::set_override(false);
        }
        let editor =
            DefaultEditor::new().map_err(|err| DesignerError::prompt(err.to_string()))?;
        Ok(Self {
            editor: Mutex::new(editor),
        })
    }

    fn read_line(&self) -> DesignerResult<String> {
        let mut editor = self.editor.lock().unwrap();
        match editor.readline("> ") {
            Ok(line) => {
                let line = line.trim().to_string();
                if !line.is_empty() {
                    let _ = editor.add_history_entry(&line);
                }
                Ok(line)
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => {
                Err(DesignerError::prompt("input closed"))
            }
            Err(err) => Err(DesignerError::prompt(err.to_string())),
        }
    }
}

#[async_trait]
impl Prompt for ReadlinePrompt {
    async fn ask(&self, question: &str) -> DesignerResult<Option<String>> {
        println!("{}", question.cyan());
        let line = self.read_line()?;
        if line.is_empty() {
            Ok(None)
        } else {
            Ok(Some(line))
        }
    }

    async fn ask_default(&self, question: &str, default: &str) -> DesignerResult<String> {
        println!("{} {}", question.cyan(), format!("[{default}]").dimmed());
        let line = self.read_line()?;
        if line.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(line)
        }
    }

    async fn confirm(&self, question: &str, default: bool) -> DesignerResult<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        loop {
            println!("{} {}", question.cyan(), hint.dimmed());
            let line = self.read_line()?.to_lowercase();
            match line.as_str() {
                "" => return Ok(default),
                "y" | "yes" | "true" => return Ok(true),
                "n" | "no" | "false" => return Ok(false),
                _ => self.warn("answer y or n"),
            }
        }
    }

    async fn choice(
        &self,
        question: &str,
        options: &[String],
        default: Option<&str>,
    ) -> DesignerResult<String> {
        loop {
            println!("{}", question.cyan());
            for (index, option) in options.iter().enumerate() {
                if Some(option.as_str()) == default {
                    println!("  {} {}", format!("{}.", index + 1).green(), option.as_str().bold());
                } else {
                    println!("  {} {}", format!("{}.", index + 1).dimmed(), option);
                }
            }
            let line = self.read_line()?;
            if line.is_empty() {
                match default {
                    Some(default) => return Ok(default.to_string()),
                    None => {
                        self.warn("pick one of the options");
                        continue;
                    }
                }
            }
            if let Ok(number) = line.parse::<usize>() {
                if number >= 1 && number <= options.len() {
                    return Ok(options[number - 1].clone());
                }
            }
            if let Some(exact) = options.iter().find(|option| option.as_str() == line) {
                return Ok(exact.clone());
            }
            self.warn(&format!("pick a number between 1 and {}", options.len()));
        }
    }

    fn info(&self, message: &str) {
        println!("{} {}", "OK".green(), message);
    }

    fn warn(&self, message: &str) {
        eprintln!("{}: {}", "warning".yellow().bold(), message);
    }
}
