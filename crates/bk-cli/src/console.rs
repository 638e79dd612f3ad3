//! Terminal implementation of [`UserIo`].

use std::io;

use bk_core::UserIo;

use crate::style::Style;

/// Prints messages on stderr and prompts with `cliclack`.
pub struct ConsoleIo {
    style: Style,
}

impl ConsoleIo {
    pub fn new(style: Style) -> Self {
        Self { style }
    }
}

impl UserIo for ConsoleIo {
    fn info(&self, message: &str) {
        eprintln!("{}", self.style.info(message));
    }

    fn warn(&self, message: &str) {
        eprintln!("{}", self.style.warn(message));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", self.style.error(message));
    }

    fn request_login(&self, default_user: Option<&str>) -> io::Result<(String, String)> {
        let mut prompt = cliclack::input("Username");
        if let Some(user) = default_user {
            prompt = prompt.default_input(user);
        }
        let user: String = prompt.interact()?;
        let password: String = cliclack::password("Password").mask('▪').interact()?;
        Ok((user.trim().to_string(), password))
    }
}
