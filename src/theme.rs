/// Host colour scheme. The renderer only ever sees the resolved [`Palette`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

impl Theme {
    pub fn from_dark_flag(dark: bool) -> Self {
        if dark { Theme::Dark } else { Theme::Light }
    }

    pub fn toggled(self) -> Self {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }

    pub fn palette(self) -> Palette {
        match self {
            Theme::Dark => Palette {
                accent: [96, 165, 250],
                background: [11, 15, 25],
                dark: true,
            },
            Theme::Light => Palette {
                accent: [37, 99, 235],
                background: [248, 250, 252],
                dark: false,
            },
        }
    }
}

/// The two colours every draw call is derived from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub accent: [u8; 3],
    pub background: [u8; 3],
    /// Whether `background` is the dark one; selects the direction text and highlights fade.
    pub dark: bool,
}

impl Palette {
    /// Colour used for text and highlights: white on dark backgrounds, near-black on light.
    pub fn foreground(&self) -> [u8; 3] {
        if self.dark { [241, 245, 249] } else { [15, 23, 42] }
    }
}
