use ratatui::style::{Color, Modifier, Style};

#[derive(Clone, Debug)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub primary: Color,
    pub accent: Color,
    pub muted: Color,
    pub selection: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            bg: Color::Black,
            fg: Color::White,
            primary: Color::Blue,
            accent: Color::Red,
            muted: Color::DarkGray,
            selection: Color::Cyan,
        }
    }
}

/// Environment a tag token hints at, matched by substring.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TagCategory {
    Dev,
    Prod,
    Test,
    Staging,
    Other,
}

impl TagCategory {
    pub fn of(tag: &str) -> Self {
        let t = tag.to_lowercase();
        if t.contains("prod") {
            TagCategory::Prod
        } else if t.contains("stag") {
            TagCategory::Staging
        } else if t.contains("test") {
            TagCategory::Test
        } else if t.contains("dev") {
            TagCategory::Dev
        } else {
            TagCategory::Other
        }
    }
}

impl Theme {
    pub fn title_style(&self) -> Style {
        Style::default().fg(self.primary).add_modifier(Modifier::BOLD)
    }
    pub fn normal_style(&self) -> Style { Style::default().fg(self.fg) }
    pub fn muted_style(&self) -> Style { Style::default().fg(self.muted) }
    pub fn selection_style(&self) -> Style { Style::default().fg(self.selection).add_modifier(Modifier::BOLD) }
    pub fn toast_style(&self) -> Style { Style::default().fg(self.accent).add_modifier(Modifier::BOLD) }
    pub fn tag_style(&self, tag: &str) -> Style {
        let color = match TagCategory::of(tag) {
            TagCategory::Dev => Color::Green,
            TagCategory::Prod => Color::Red,
            TagCategory::Test => Color::Yellow,
            TagCategory::Staging => Color::Magenta,
            TagCategory::Other => self.muted,
        };
        Style::default().fg(color)
    }
}
