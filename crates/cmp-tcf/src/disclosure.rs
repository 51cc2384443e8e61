use crate::VendorRecord;

const SECONDS_PER_DAY: i64 = 60 * 60 * 24;

/// Cookie / device-storage disclosure sentence for a vendor.
///
/// Returns `None` when the vendor declares neither cookies nor other
/// storage access.
pub fn storage_disclosure(vendor: &VendorRecord) -> Option<String> {
    let s = &vendor.storage;
    let name = &vendor.name;

    if s.uses_cookies {
        let days = s
            .cookie_max_age_seconds
            .filter(|secs| *secs > 0)
            .map(|secs| secs / SECONDS_PER_DAY + i64::from(secs % SECONDS_PER_DAY != 0))
            .unwrap_or(0);
        let mut text =
            format!("{name} stores cookies with a maximum duration of about {days} Day(s).");
        if s.cookie_refresh {
            text.push_str(" These cookies may be refreshed.");
        }
        if s.uses_non_cookie_access {
            text.push_str(
                " This vendor also uses other methods like \"local storage\" to store and access information on your device.",
            );
        }
        return Some(text);
    }

    if s.uses_non_cookie_access {
        return Some(format!(
            "{name} uses methods like \"local storage\" to store and access information on your device."
        ));
    }

    None
}
