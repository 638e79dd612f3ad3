use std::io;

/// Interaction with whoever drives the client.
///
/// Messages are user-facing output, distinct from tracing diagnostics.
pub trait UserIo {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    /// Asks for a username (offering `default_user`) and a password.
    fn request_login(&self, default_user: Option<&str>) -> io::Result<(String, String)>;
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;

    use super::UserIo;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub(crate) enum Level {
        Info,
        Warn,
        Error,
    }

    /// Records every message and answers login prompts from a script.
    #[derive(Default)]
    pub(crate) struct ScriptedIo {
        messages: RefCell<Vec<(Level, String)>>,
        logins: RefCell<VecDeque<(String, String)>>,
        prompts: RefCell<Vec<Option<String>>>,
    }

    impl ScriptedIo {
        pub(crate) fn with_logins(logins: &[(&str, &str)]) -> Self {
            let io = Self::default();
            io.logins.borrow_mut().extend(
                logins
                    .iter()
                    .map(|(user, password)| ((*user).to_string(), (*password).to_string())),
            );
            io
        }

        pub(crate) fn messages(&self, level: &Level) -> Vec<String> {
            self.messages
                .borrow()
                .iter()
                .filter(|(l, _)| l == level)
                .map(|(_, message)| message.clone())
                .collect()
        }

        pub(crate) fn contains(&self, level: &Level, needle: &str) -> bool {
            self.messages(level).iter().any(|m| m.contains(needle))
        }

        /// Default user offered at each prompt, in order.
        pub(crate) fn prompts(&self) -> Vec<Option<String>> {
            self.prompts.borrow().clone()
        }

        fn push(&self, level: Level, message: &str) {
            self.messages.borrow_mut().push((level, message.to_string()));
        }
    }

    impl UserIo for ScriptedIo {
        fn info(&self, message: &str) {
            self.push(Level::Info, message);
        }

        fn warn(&self, message: &str) {
            self.push(Level::Warn, message);
        }

        fn error(&self, message: &str) {
            self.push(Level::Error, message);
        }

        fn request_login(&self, default_user: Option<&str>) -> io::Result<(String, String)> {
            self.prompts
                .borrow_mut()
                .push(default_user.map(ToOwned::to_owned));
            self.logins
                .borrow_mut()
                .pop_front()
                .ok_or_else(|| io::Error::new(io::ErrorKind::UnexpectedEof, "no scripted login"))
        }
    }
}
