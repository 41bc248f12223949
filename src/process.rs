//! Command templates for process-backed collaborators
//!
//! Camera, face detector, recorder, transcriber and wakeword runner are
//! all external programs. A template is a whitespace separated command
//! line where `{name}` placeholders are substituted per invocation.

use std::fmt;
use std::process::Command;

use crate::error::{Error, Result};

/// A parsed command line with placeholder substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandTemplate {
    program: String,
    args: Vec<String>,
}

impl CommandTemplate {
    /// Parse a template such as `arecord -d {seconds} {path}`
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| Error::Configuration("empty command template".to_string()))?;

        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    /// Build a template from an explicit program and argument list
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Program name (first word of the template)
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments with every `{key}` replaced by its value
    pub fn render_args(&self, vars: &[(&str, &str)]) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                vars.iter().fold(arg.clone(), |acc, (key, value)| {
                    acc.replace(&format!("{{{key}}}"), value)
                })
            })
            .collect()
    }

    /// A ready-to-spawn `Command`
    pub fn command(&self, vars: &[(&str, &str)]) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(self.render_args(vars));
        cmd
    }
}

impl fmt::Display for CommandTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_render() {
        let tpl = CommandTemplate::parse("arecord -q -d {seconds} {path}").unwrap();
        assert_eq!(tpl.program(), "arecord");
        assert_eq!(
            tpl.render_args(&[("seconds", "5"), ("path", "/tmp/out.wav")]),
            vec!["-q", "-d", "5", "/tmp/out.wav"]
        );
    }

    #[test]
    fn test_placeholder_inside_argument() {
        let tpl = CommandTemplate::parse("stt --audio=./{path}").unwrap();
        assert_eq!(tpl.render_args(&[("path", "a.wav")]), vec!["--audio=./a.wav"]);
    }

    #[test]
    fn test_unknown_placeholder_left_alone() {
        let tpl = CommandTemplate::parse("cam {device}").unwrap();
        assert_eq!(tpl.render_args(&[]), vec!["{device}"]);
    }

    #[test]
    fn test_empty_template_rejected() {
        assert!(matches!(
            CommandTemplate::parse("   "),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_display_round_trip() {
        let tpl = CommandTemplate::parse("deepspeech  --audio {path}").unwrap();
        assert_eq!(tpl.to_string(), "deepspeech --audio {path}");
    }
}
