use quay_core::{
    config::{NamedColor, ThemeColor, ThemeConfig, ThemePreset},
    tool::ToolStatus,
};
use ratatui::style::Color;

pub struct Theme {
    pub accent: Color,
    pub running: Color,
    pub waiting: Color,
    pub idle: Color,
    pub recycled: Color,
    pub error: Color,
    pub muted: Color,
    pub border: Color,
    pub highlight_fg: Color,
}

impl Theme {
    fn preset(preset: ThemePreset) -> Self {
        match preset {
            ThemePreset::Default => Self {
                accent: Color::Magenta,
                running: Color::Green,
                waiting: Color::Yellow,
                idle: Color::Cyan,
                recycled: Color::DarkGray,
                error: Color::Red,
                muted: Color::DarkGray,
                border: Color::DarkGray,
                highlight_fg: Color::Black,
            },
            ThemePreset::Light => Self {
                accent: Color::Blue,
                running: Color::Green,
                waiting: Color::Magenta,
                idle: Color::Blue,
                recycled: Color::Gray,
                error: Color::Red,
                muted: Color::Gray,
                border: Color::Gray,
                highlight_fg: Color::White,
            },
            ThemePreset::Mono => Self {
                accent: Color::White,
                running: Color::White,
                waiting: Color::White,
                idle: Color::Gray,
                recycled: Color::DarkGray,
                error: Color::White,
                muted: Color::DarkGray,
                border: Color::Gray,
                highlight_fg: Color::Black,
            },
        }
    }

    /// Colours for `preset`, with any configured overrides on top.
    pub fn new(preset: ThemePreset, config: &ThemeConfig) -> Self {
        let base = Self::preset(preset);
        let pick =
            |over: Option<ThemeColor>, fallback: Color| over.map_or(fallback, to_ratatui_color);
        Self {
            accent: pick(config.accent, base.accent),
            running: pick(config.running, base.running),
            waiting: pick(config.waiting, base.waiting),
            idle: pick(config.idle, base.idle),
            recycled: pick(config.recycled, base.recycled),
            error: pick(config.error, base.error),
            muted: pick(config.muted, base.muted),
            border: pick(config.border, base.border),
            highlight_fg: pick(config.highlight_fg, base.highlight_fg),
        }
    }

    pub fn from_config(config: &ThemeConfig) -> Self {
        Self::new(config.preset, config)
    }

    pub fn status(&self, status: ToolStatus) -> Color {
        match status {
            ToolStatus::Running => self.running,
            ToolStatus::Waiting => self.waiting,
            ToolStatus::Idle => self.idle,
            ToolStatus::Unknown => self.muted,
        }
    }
}

fn to_ratatui_color(color: ThemeColor) -> Color {
    match color {
        ThemeColor::Rgb(r, g, b) => Color::Rgb(r, g, b),
        ThemeColor::Named(named) => match named {
            NamedColor::Black => Color::Black,
            NamedColor::Red => Color::Red,
            NamedColor::Green => Color::Green,
            NamedColor::Yellow => Color::Yellow,
            NamedColor::Blue => Color::Blue,
            NamedColor::Magenta => Color::Magenta,
            NamedColor::Cyan => Color::Cyan,
            NamedColor::White => Color::White,
            NamedColor::Gray => Color::Gray,
            NamedColor::DarkGray => Color::DarkGray,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_defaults() {
        let theme = Theme::from_config(&ThemeConfig::default());
        assert_eq!(theme.accent, Color::Magenta);
        assert_eq!(theme.running, Color::Green);
        assert_eq!(theme.waiting, Color::Yellow);
        assert_eq!(theme.error, Color::Red);
        assert_eq!(theme.muted, Color::DarkGray);
        assert_eq!(theme.highlight_fg, Color::Black);
    }

    #[test]
    fn test_overrides_apply_to_every_preset() {
        let config = ThemeConfig {
            accent: Some(ThemeColor::Named(NamedColor::Blue)),
            error: Some(ThemeColor::Rgb(255, 0, 255)),
            ..ThemeConfig::default()
        };
        for preset in ThemePreset::ALL {
            let theme = Theme::new(preset, &config);
            assert_eq!(theme.accent, Color::Blue);
            assert_eq!(theme.error, Color::Rgb(255, 0, 255));
        }
        assert_eq!(Theme::new(ThemePreset::Light, &config).highlight_fg, Color::White);
    }

    #[test]
    fn test_status_colors() {
        let theme = Theme::from_config(&ThemeConfig::default());
        assert_eq!(theme.status(ToolStatus::Waiting), theme.waiting);
        assert_eq!(theme.status(ToolStatus::Unknown), theme.muted);
    }
}
