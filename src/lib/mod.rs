//! Misc

use std::time::Duration;

use url::Url;

use crate::serenity;

/// Where discord's OAuth2 bot invites live.
const AUTHORIZE_URL: &str = "https://discord.com/oauth2/authorize";

/// Helper function to format a duration, e.g. `1d 02h 03m 04s`.
pub fn format_duration(dur: &Duration) -> String {
    let total_secs = dur.as_secs();
    let total_mins = total_secs / 60;
    let total_hours = total_mins / 60;

    let days = total_hours / 24;
    let hours = total_hours % 24;
    let mins = total_mins % 60;
    let secs = total_secs % 60;

    if days > 0 {
        format!("{days}d {hours:02}h {mins:02}m {secs:02}s")
    } else if hours > 0 {
        format!("{hours:02}h {mins:02}m {secs:02}s")
    } else {
        format!("{mins:02}m {secs:02}s")
    }
}

/// Link that adds the bot to a guild with `permissions`.
pub fn invite_url(client_id: serenity::ApplicationId, permissions: serenity::Permissions) -> Url {
    let params = [
        ("client_id", client_id.to_string()),
        ("permissions", permissions.bits().to_string()),
        ("scope", "bot applications.commands".to_string()),
    ];
    Url::parse_with_params(AUTHORIZE_URL, &params).expect("authorize url is valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_durations_skip_hours() {
        assert_eq!(format_duration(&Duration::from_secs(65)), "01m 05s");
    }

    #[test]
    fn long_durations_show_days() {
        let dur = Duration::from_secs(86_400 + 2 * 3600 + 3 * 60 + 4);
        assert_eq!(format_duration(&dur), "1d 02h 03m 04s");
    }

    #[test]
    fn admin_invite() {
        let url = invite_url(
            serenity::ApplicationId::new(1234),
            serenity::Permissions::ADMINISTRATOR,
        );
        assert_eq!(
            url.as_str(),
            "https://discord.com/oauth2/authorize?client_id=1234&permissions=8&scope=bot+applications.commands"
        );
    }
}
