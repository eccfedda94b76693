// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::io::BufRead;
use std::io::IsTerminal;
use std::io::Write;

use anyhow::Context;
use entra_sync::ClientSecret;
use entra_sync::Config;
use entra_sync::Credentials;
use entra_sync::Error;

/// Prompting needs a terminal on stdin; fail before asking anything.
pub fn ensure_interactive() -> Result<(), Error> {
    ensure_terminal(&std::io::stdin())
}

pub fn ensure_terminal<T: IsTerminal>(input: &T) -> Result<(), Error> {
    if !input.is_terminal() {
        return Err(Error::Prerequisite(
            "an interactive terminal is required to enter credentials"
                .to_string(),
        ));
    }

    Ok(())
}

pub trait Prompter {
    /// Reads a visible line
    fn reply(&mut self, prompt: &str) -> std::io::Result<String>;

    /// Reads a line without echoing it
    fn password(&mut self, prompt: &str) -> std::io::Result<String>;
}

/// Prompts on the controlling terminal.
#[derive(Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn reply(&mut self, prompt: &str) -> std::io::Result<String> {
        rprompt::prompt_reply(prompt)
    }

    fn password(&mut self, prompt: &str) -> std::io::Result<String> {
        rpassword::prompt_password(prompt)
    }
}

/// Prompts on arbitrary streams.
pub struct StreamPrompter<R, W> {
    reader: R,
    writer: W,
}

impl<R: BufRead, W: Write> StreamPrompter<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self { reader, writer }
    }

    pub fn into_writer(self) -> W {
        self.writer
    }
}

impl<R: BufRead, W: Write> Prompter for StreamPrompter<R, W> {
    fn reply(&mut self, prompt: &str) -> std::io::Result<String> {
        rprompt::prompt_reply_from_bufread(
            &mut self.reader,
            &mut self.writer,
            prompt,
        )
    }

    fn password(&mut self, prompt: &str) -> std::io::Result<String> {
        rpassword::prompt_password_from_bufread(
            &mut self.reader,
            &mut self.writer,
            prompt,
        )
    }
}

/// Asks for tenant, application, secret and display name, in that order.
///
/// Each answer is checked as soon as it is given, so a blank one ends the
/// run without asking for the rest.
pub fn prompt_config<P: Prompter>(prompter: &mut P) -> anyhow::Result<Config> {
    let tenant_id = prompter
        .reply("Enter Tenant ID: ")
        .context("reading tenant id")?;
    if tenant_id.trim().is_empty() {
        return Err(Error::MissingInput("tenant id").into());
    }

    let client_id = prompter
        .reply("Enter App (Client) ID: ")
        .context("reading application id")?;
    if client_id.trim().is_empty() {
        return Err(Error::MissingInput("application id").into());
    }

    let client_secret = prompter
        .password("Enter Client Secret: ")
        .context("reading client secret")?;
    let client_secret = ClientSecret::new(client_secret)?;

    let credentials = Credentials::new(tenant_id, client_id, client_secret)?;

    let display_name = prompter
        .reply("Enter Display Name of Service Principal: ")
        .context("reading display name")?;

    Ok(Config::new(credentials, display_name)?)
}
