//! Console appearance and notification preferences.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// Which notifications the admin receives
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NotificationPreferences {
    pub email_notifications: bool,
    pub marketing_emails: bool,
    pub seller_reports: bool,
    pub security_alerts: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            email_notifications: true,
            marketing_emails: false,
            seller_reports: true,
            security_alerts: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct Preferences {
    pub theme: Theme,
    #[validate(length(min = 1, max = 32, message = "Accent color is required"))]
    pub accent_color: String,
    pub animations_enabled: bool,
    #[validate(length(min = 1, max = 32, message = "Language is required"))]
    pub language: String,
    #[validate(length(min = 1, max = 64, message = "Timezone is required"))]
    pub timezone: String,
    #[validate(length(min = 1, max = 16, message = "Date format is required"))]
    pub date_format: String,
    pub notifications: NotificationPreferences,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            accent_color: "default".to_string(),
            animations_enabled: true,
            language: "english".to_string(),
            timezone: "UTC".to_string(),
            date_format: "MM/DD/YYYY".to_string(),
            notifications: NotificationPreferences::default(),
        }
    }
}
