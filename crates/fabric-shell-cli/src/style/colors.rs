//! Semantic color palette for terminal output.

use owo_colors::{OwoColorize, Style};

pub fn success_style() -> Style {
    Style::new().green().bold()
}

pub fn error_style() -> Style {
    Style::new().red().bold()
}

pub fn warning_style() -> Style {
    Style::new().yellow()
}

pub fn muted_style() -> Style {
    Style::new().dimmed()
}

/// Applies a semantic style to anything displayable, honoring `--no-color`.
pub trait SemanticStyle: Sized {
    fn paint(&self, style: Style) -> String;

    fn success(&self) -> String {
        self.paint(success_style())
    }

    fn error(&self) -> String {
        self.paint(error_style())
    }

    fn warning(&self) -> String {
        self.paint(warning_style())
    }

    fn muted(&self) -> String {
        self.paint(muted_style())
    }
}

impl<T: std::fmt::Display> SemanticStyle for T {
    fn paint(&self, style: Style) -> String {
        if super::no_color() {
            self.to_string()
        } else {
            self.style(style).to_string()
        }
    }
}
