use std::str::FromStr;

use tuirealm::ratatui::style::Color;

use crate::types::{Rgb, Student};
use crate::urgency::Urgency;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Default)]
pub enum ThemePreset {
    #[default]
    Default,
    Light,
    HighContrast,
    Mono,
}

impl ThemePreset {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Light => "light",
            Self::HighContrast => "high-contrast",
            Self::Mono => "mono",
        }
    }

    pub const fn next(self) -> Self {
        match self {
            Self::Default => Self::Light,
            Self::Light => Self::HighContrast,
            Self::HighContrast => Self::Mono,
            Self::Mono => Self::Default,
        }
    }
}

impl FromStr for ThemePreset {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "default" | "dark" | "chalkboard" => Ok(Self::Default),
            "light" | "paper" => Ok(Self::Light),
            "high-contrast" | "contrast" => Ok(Self::HighContrast),
            "mono" | "plain" => Ok(Self::Mono),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Theme {
    pub preset: ThemePreset,
    pub base: BasePalette,
    pub interactive: InteractivePalette,
    pub urgency: UrgencyPalette,
    pub dialog: DialogPalette,
}

#[derive(Debug, Clone, Copy)]
pub struct BasePalette {
    pub canvas: Color,
    pub text: Color,
    pub text_muted: Color,
    pub header: Color,
    pub accent: Color,
    pub danger: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct InteractivePalette {
    pub focus: Color,
    pub selected_bg: Color,
    pub selected_border: Color,
    pub border: Color,
}

/// Row highlight for cards that need attention soon.
#[derive(Debug, Clone, Copy)]
pub struct UrgencyPalette {
    pub overdue: Color,
    pub tomorrow: Color,
    pub today: Color,
    pub done: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct DialogPalette {
    pub surface: Color,
    pub input_bg: Color,
    pub button_bg: Color,
    pub button_fg: Color,
}

#[derive(Debug, Clone, Copy)]
pub struct CardColors {
    pub background: Color,
    pub border: Color,
}

impl Theme {
    pub fn from_preset(preset: ThemePreset) -> Self {
        let (base, interactive, urgency, dialog) = match preset {
            ThemePreset::Default => (
                BasePalette {
                    canvas: Color::Rgb(30, 37, 35),
                    text: Color::Rgb(232, 236, 230),
                    text_muted: Color::Rgb(128, 140, 134),
                    header: Color::Rgb(125, 211, 192),
                    accent: Color::Rgb(196, 181, 253),
                    danger: Color::Rgb(248, 113, 113),
                },
                InteractivePalette {
                    focus: Color::Rgb(125, 211, 192),
                    selected_bg: Color::Rgb(44, 56, 52),
                    selected_border: Color::Rgb(253, 224, 71),
                    border: Color::Rgb(70, 84, 79),
                },
                UrgencyPalette {
                    overdue: Color::Rgb(239, 68, 68),
                    tomorrow: Color::Rgb(249, 115, 22),
                    today: Color::Rgb(234, 179, 8),
                    done: Color::Rgb(100, 112, 107),
                },
                DialogPalette {
                    surface: Color::Rgb(34, 43, 40),
                    input_bg: Color::Rgb(47, 58, 54),
                    button_bg: Color::Rgb(125, 211, 192),
                    button_fg: Color::Black,
                },
            ),
            ThemePreset::Light => (
                BasePalette {
                    canvas: Color::Rgb(252, 250, 242),
                    text: Color::Rgb(41, 37, 36),
                    text_muted: Color::Rgb(120, 113, 108),
                    header: Color::Rgb(29, 78, 216),
                    accent: Color::Rgb(190, 24, 93),
                    danger: Color::Rgb(220, 38, 38),
                },
                InteractivePalette {
                    focus: Color::Rgb(29, 78, 216),
                    selected_bg: Color::Rgb(254, 243, 199),
                    selected_border: Color::Rgb(217, 119, 6),
                    border: Color::Rgb(214, 211, 209),
                },
                UrgencyPalette {
                    overdue: Color::Rgb(185, 28, 28),
                    tomorrow: Color::Rgb(194, 65, 12),
                    today: Color::Rgb(161, 98, 7),
                    done: Color::Rgb(168, 162, 158),
                },
                DialogPalette {
                    surface: Color::Rgb(255, 253, 247),
                    input_bg: Color::Rgb(245, 245, 244),
                    button_bg: Color::Rgb(29, 78, 216),
                    button_fg: Color::White,
                },
            ),
            ThemePreset::HighContrast => (
                BasePalette {
                    canvas: Color::Black,
                    text: Color::White,
                    text_muted: Color::Gray,
                    header: Color::LightCyan,
                    accent: Color::LightMagenta,
                    danger: Color::LightRed,
                },
                InteractivePalette {
                    focus: Color::LightCyan,
                    selected_bg: Color::Rgb(28, 28, 28),
                    selected_border: Color::LightYellow,
                    border: Color::White,
                },
                UrgencyPalette {
                    overdue: Color::LightRed,
                    tomorrow: Color::LightMagenta,
                    today: Color::LightYellow,
                    done: Color::Gray,
                },
                DialogPalette {
                    surface: Color::Black,
                    input_bg: Color::Rgb(32, 32, 32),
                    button_bg: Color::LightYellow,
                    button_fg: Color::Black,
                },
            ),
            ThemePreset::Mono => (
                BasePalette {
                    canvas: Color::Reset,
                    text: Color::White,
                    text_muted: Color::DarkGray,
                    header: Color::White,
                    accent: Color::Gray,
                    danger: Color::White,
                },
                InteractivePalette {
                    focus: Color::White,
                    selected_bg: Color::Rgb(48, 48, 48),
                    selected_border: Color::White,
                    border: Color::DarkGray,
                },
                UrgencyPalette {
                    overdue: Color::White,
                    tomorrow: Color::White,
                    today: Color::Gray,
                    done: Color::DarkGray,
                },
                DialogPalette {
                    surface: Color::Reset,
                    input_bg: Color::Rgb(38, 38, 38),
                    button_bg: Color::White,
                    button_fg: Color::Black,
                },
            ),
        };
        Self {
            preset,
            base,
            interactive,
            urgency,
            dialog,
        }
    }

    pub fn urgency_color(&self, urgency: Urgency) -> Option<Color> {
        match urgency {
            Urgency::Overdue { .. } => Some(self.urgency.overdue),
            Urgency::DueTomorrow => Some(self.urgency.tomorrow),
            Urgency::DueToday => Some(self.urgency.today),
            Urgency::NoDate | Urgency::Upcoming { .. } => None,
        }
    }

    /// Returns the student's `(base, shade)` pair; mono drops hue.
    pub fn student_colors(&self, student: Student) -> (Color, Color) {
        if self.preset == ThemePreset::Mono {
            return (self.base.text, self.base.text_muted);
        }
        let palette = student.palette();
        (rgb(palette.base), rgb(palette.shade))
    }

    pub fn card_colors(&self, selected: bool) -> CardColors {
        if selected {
            CardColors {
                background: self.interactive.selected_bg,
                border: self.interactive.selected_border,
            }
        } else {
            CardColors {
                background: Color::Reset,
                border: self.interactive.border,
            }
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::from_preset(ThemePreset::Default)
    }
}

fn rgb(value: Rgb) -> Color {
    Color::Rgb(value.0, value.1, value.2)
}
