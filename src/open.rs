//! Launching resolved URLs in a browser window.

use std::process::{Command, Stdio};

use crate::error::{Error, Result};

pub trait UrlOpener {
    fn open(&self, urls: &[String]) -> Result<()>;
}

/// Spawns `<command...> --new-window <urls...>` without waiting for it.
#[derive(Debug, Clone)]
pub struct BrowserOpener {
    command: Vec<String>,
}

impl BrowserOpener {
    pub fn new(command: Vec<String>) -> Self {
        Self { command }
    }

    pub fn command_line(&self, urls: &[String]) -> Vec<String> {
        let mut line = self.command.clone();
        line.push("--new-window".to_string());
        line.extend(urls.iter().cloned());
        line
    }
}

impl UrlOpener for BrowserOpener {
    fn open(&self, urls: &[String]) -> Result<()> {
        if urls.is_empty() {
            return Ok(());
        }
        let line = self.command_line(urls);
        let Some((program, args)) = line.split_first() else {
            return Err(Error::InvalidRequest("browser command is empty".to_string()));
        };

        tracing::debug!("launching {program} with {} URLs", urls.len());
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| Error::io(program, e))?;
        Ok(())
    }
}
