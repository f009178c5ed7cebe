//! Caller context passed explicitly into every operation.

use serde::{Deserialize, Serialize};

/// Who is looking at the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
    /// Editors and admins may see moderated ratings and comments.
    pub can_moderate: bool,
    pub locale: Locale,
}

impl Viewer {
    pub fn public(locale: impl Into<Locale>) -> Self {
        Self {
            can_moderate: false,
            locale: locale.into(),
        }
    }

    pub fn editor(locale: impl Into<Locale>) -> Self {
        Self {
            can_moderate: true,
            locale: locale.into(),
        }
    }

    /// Role tag folded into cache fingerprints.
    pub fn role(&self) -> &'static str {
        if self.can_moderate { "editor" } else { "public" }
    }
}

impl Default for Viewer {
    fn default() -> Self {
        Self::public(Locale::default())
    }
}

/// A locale code such as `en_US` or `de_DE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locale(String);

impl Locale {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn code(&self) -> &str {
        &self.0
    }

    fn language(&self) -> &str {
        self.0.split(['_', '-']).next().unwrap_or("").trim()
    }

    /// Decimal and thousands separators for this locale.
    pub fn separators(&self) -> (char, char) {
        match self.language().to_ascii_lowercase().as_str() {
            "de" | "es" | "it" | "pt" | "nl" | "da" | "tr" | "id" => (',', '.'),
            "fr" | "sv" | "nb" | "nn" | "fi" | "pl" | "cs" | "ru" | "uk" => (',', '\u{a0}'),
            _ => ('.', ','),
        }
    }

    /// Format a number with a fixed number of decimals and grouped thousands.
    pub fn format_decimal(&self, value: f64, decimals: usize) -> String {
        let (decimal, thousands) = self.separators();
        let fixed = format!("{:.*}", decimals, value.abs());
        let (int_part, frac_part) = match fixed.split_once('.') {
            Some((i, f)) => (i, Some(f)),
            None => (fixed.as_str(), None),
        };

        let mut grouped = String::new();
        for (i, ch) in int_part.chars().enumerate() {
            if i > 0 && (int_part.len() - i) % 3 == 0 {
                grouped.push(thousands);
            }
            grouped.push(ch);
        }

        let mut out = String::new();
        if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
            out.push('-');
        }
        out.push_str(&grouped);
        if let Some(frac) = frac_part {
            out.push(decimal);
            out.push_str(frac);
        }
        out
    }
}

impl Default for Locale {
    fn default() -> Self {
        Self::new("en_US")
    }
}

impl From<&str> for Locale {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for Locale {
    fn from(code: String) -> Self {
        Self(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_decimal_per_locale() {
        assert_eq!(Locale::new("en_US").format_decimal(3.756, 2), "3.76");
        assert_eq!(Locale::new("de_DE").format_decimal(3.5, 2), "3,50");
        assert_eq!(Locale::new("es").format_decimal(12345.5, 2), "12.345,50");
        assert_eq!(Locale::new("en_GB").format_decimal(1234567.0, 0), "1,234,567");
    }

    #[test]
    fn test_viewer_role() {
        assert_eq!(Viewer::public("en_US").role(), "public");
        assert_eq!(Viewer::editor("en_US").role(), "editor");
    }
}
