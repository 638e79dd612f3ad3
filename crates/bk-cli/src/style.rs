use std::env;

use color_eyre::owo_colors::OwoColorize;

#[derive(Clone, Copy, Debug)]
pub struct Style {
    enabled: bool,
}

impl Style {
    pub fn new(force_no_color: bool, is_tty: bool) -> Self {
        let env_no_color = env::var_os("NO_COLOR").is_some();
        Self {
            enabled: !(force_no_color || env_no_color) && is_tty,
        }
    }

    pub fn success(self, text: &str) -> String {
        self.paint(&format!("✔ {text}"), Tone::Green, true)
    }

    pub fn info(self, text: &str) -> String {
        self.paint(text, Tone::Blue, false)
    }

    pub fn warn(self, text: &str) -> String {
        self.paint(&format!("WARN: {text}"), Tone::Yellow, false)
    }

    pub fn error(self, text: &str) -> String {
        self.paint(&format!("✖ {text}"), Tone::Red, true)
    }

    pub fn table_header(self, text: &str) -> String {
        if !self.enabled {
            return text.to_string();
        }
        text.bold().to_string()
    }

    fn paint(self, text: &str, tone: Tone, bold: bool) -> String {
        if !self.enabled {
            return text.to_string();
        }
        match (tone, bold) {
            (Tone::Green, true) => text.green().bold().to_string(),
            (Tone::Green, false) => text.green().to_string(),
            (Tone::Yellow, true) => text.yellow().bold().to_string(),
            (Tone::Yellow, false) => text.yellow().to_string(),
            (Tone::Red, true) => text.red().bold().to_string(),
            (Tone::Red, false) => text.red().to_string(),
            (Tone::Blue, true) => text.cyan().bold().to_string(),
            (Tone::Blue, false) => text.cyan().to_string(),
        }
    }
}

enum Tone {
    Green,
    Yellow,
    Red,
    Blue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_style_leaves_text_plain() {
        let style = Style::new(true, true);
        assert_eq!(style.info("hello"), "hello");
        assert_eq!(style.warn("careful"), "WARN: careful");
        assert_eq!(style.error("boom"), "✖ boom");
    }

    #[test]
    fn non_tty_output_is_never_colored() {
        let style = Style::new(false, false);
        assert_eq!(style.success("done"), "✔ done");
    }
}
