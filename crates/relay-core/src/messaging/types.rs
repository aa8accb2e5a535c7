use std::{fmt, str::FromStr};

use crate::errors::Error;

/// Highlight color of a broadcast.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BroadcastColor {
    #[default]
    Yellow,
    Red,
    Green,
    Purple,
    Random,
}

impl BroadcastColor {
    pub const ALL: [BroadcastColor; 5] = [
        BroadcastColor::Yellow,
        BroadcastColor::Red,
        BroadcastColor::Green,
        BroadcastColor::Purple,
        BroadcastColor::Random,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BroadcastColor::Yellow => "yellow",
            BroadcastColor::Red => "red",
            BroadcastColor::Green => "green",
            BroadcastColor::Purple => "purple",
            BroadcastColor::Random => "random",
        }
    }

    /// Lenient parse for colors coming from bot scripts: anything unknown or
    /// missing falls back to the default.
    pub fn from_backend(raw: Option<&str>) -> Self {
        raw.and_then(|s| s.parse().ok()).unwrap_or_default()
    }
}

impl fmt::Display for BroadcastColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BroadcastColor {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        BroadcastColor::ALL
            .into_iter()
            .find(|c| c.as_str() == lower)
            .ok_or_else(|| {
                let names = BroadcastColor::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                Error::Validation(format!("unknown color `{s}` (expected one of: {names})"))
            })
    }
}

/// A single outbound broadcast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BroadcastRequest {
    pub from: String,
    pub message: String,
    pub color: BroadcastColor,
}

/// What the broadcast API said about a request it received.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastReceipt {
    Delivered,
    Rejected(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_colors_case_insensitively() {
        assert_eq!("RED".parse::<BroadcastColor>().unwrap(), BroadcastColor::Red);
        assert_eq!(
            " purple ".parse::<BroadcastColor>().unwrap(),
            BroadcastColor::Purple
        );
    }

    #[test]
    fn unknown_color_is_a_validation_error() {
        let err = "blue".parse::<BroadcastColor>().unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(err.to_string().contains("yellow"));
    }

    #[test]
    fn backend_colors_fall_back_to_yellow() {
        assert_eq!(BroadcastColor::from_backend(None), BroadcastColor::Yellow);
        assert_eq!(
            BroadcastColor::from_backend(Some("mauve")),
            BroadcastColor::Yellow
        );
        assert_eq!(
            BroadcastColor::from_backend(Some("green")),
            BroadcastColor::Green
        );
    }
}
