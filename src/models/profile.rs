use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
    Neon,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
            Theme::Neon => "neon",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dark" => Ok(Theme::Dark),
            "light" => Ok(Theme::Light),
            "neon" => Ok(Theme::Neon),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub profile_photo: Option<String>,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub tagline: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub theme: Theme,
    #[serde(default)]
    pub learning_mood: Option<String>,
    #[serde(default)]
    pub daily_journal: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub streak_days: i32,
}

/// Hosted rows may carry `null` in columns the dashboard treats as defaulted.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Profile {
    /// Applies the fields a patch carries; absent fields stay as they are.
    pub fn apply(&mut self, patch: &ProfilePatch) {
        if let Some(tagline) = &patch.tagline {
            self.tagline = Some(tagline.clone());
        }
        if let Some(mood) = &patch.learning_mood {
            self.learning_mood = Some(mood.clone());
        }
        if let Some(journal) = &patch.daily_journal {
            self.daily_journal = Some(journal.clone());
        }
        if let Some(theme) = patch.theme {
            self.theme = theme;
        }
    }
}

/// Body of the profile edit form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileEditRequest {
    pub tagline: String,
    pub learning_mood: String,
    pub daily_journal: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeRequest {
    pub theme: Theme,
}

/// The owner-editable columns of a profile row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfilePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub learning_mood: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_journal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
}

impl From<ProfileEditRequest> for ProfilePatch {
    fn from(req: ProfileEditRequest) -> Self {
        Self {
            tagline: Some(req.tagline),
            learning_mood: Some(req.learning_mood),
            daily_journal: Some(req.daily_journal),
            theme: None,
        }
    }
}

impl From<Theme> for ProfilePatch {
    fn from(theme: Theme) -> Self {
        Self {
            theme: Some(theme),
            ..Self::default()
        }
    }
}
