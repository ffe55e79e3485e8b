use std::collections::{BTreeMap, BTreeSet};

/// Set-based diff over privileges/roles/members (`SPEC_FULL.md` 4.4).
/// Returns `(to_add, to_remove)`; order of the inputs never matters.
pub fn set_diff(desired: &[String], observed: &[String]) -> (Vec<String>, Vec<String>) {
    let desired: BTreeSet<&String> = desired.iter().collect();
    let observed: BTreeSet<&String> = observed.iter().collect();
    let to_add = desired.difference(&observed).map(|s| (*s).clone()).collect();
    let to_remove = observed.difference(&desired).map(|s| (*s).clone()).collect();
    (to_add, to_remove)
}

/// True when `set_diff` would produce no changes at all.
pub fn sets_match(desired: &[String], observed: &[String]) -> bool {
    let (add, remove) = set_diff(desired, observed);
    add.is_empty() && remove.is_empty()
}

/// Outcome of a map diff: keys to set (new or changed value), keys to
/// clear (present only in `observed`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MapDiff {
    pub to_set: BTreeMap<String, String>,
    pub to_clear: Vec<String>,
}

/// Map diff over configuration parameters (`SPEC_FULL.md` 4.4): keys only
/// in `desired` are set, keys only in `observed` are cleared, keys in both
/// with different values are set.
pub fn map_diff(desired: &BTreeMap<String, String>, observed: &BTreeMap<String, String>) -> MapDiff {
    let mut to_set = BTreeMap::new();
    for (k, v) in desired {
        match observed.get(k) {
            Some(ov) if ov == v => {}
            _ => {
                to_set.insert(k.clone(), v.clone());
            }
        }
    }
    let to_clear = observed
        .keys()
        .filter(|k| !desired.contains_key(*k))
        .cloned()
        .collect();
    MapDiff { to_set, to_clear }
}

/// Password-drift verdict (`SPEC_FULL.md` 4.4): did the spec's password
/// (read from the role/user's password secret) change relative to what
/// was last written to the connection-details secret at create time?
pub fn password_drift(spec_password: &str, connection_details_password: &str) -> bool {
    spec_password != connection_details_password
}

/// Whether a server-recorded password-change timestamp indicates the
/// password was changed by something other than this controller. `skew`
/// absorbs clock/replication lag (`SPEC_FULL.md` 4.4 uses 3 seconds).
pub fn externally_changed(
    created_at: chrono::DateTime<chrono::Utc>,
    server_changed_at: Option<chrono::DateTime<chrono::Utc>>,
    skew: chrono::Duration,
) -> bool {
    match server_changed_at {
        Some(changed) => changed > created_at + skew,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_diff_is_order_independent() {
        let a = vec!["A".to_string(), "B".to_string()];
        let b = vec!["B".to_string(), "A".to_string()];
        let (add, remove) = set_diff(&a, &b);
        assert!(add.is_empty());
        assert!(remove.is_empty());
    }

    #[test]
    fn set_diff_computes_add_and_remove() {
        let desired = vec!["SELECT".to_string(), "INSERT".to_string()];
        let observed = vec!["SELECT".to_string(), "DELETE".to_string()];
        let (add, remove) = set_diff(&desired, &observed);
        assert_eq!(add, vec!["INSERT".to_string()]);
        assert_eq!(remove, vec!["DELETE".to_string()]);
    }

    #[test]
    fn map_diff_sets_new_and_changed_clears_removed() {
        let mut desired = BTreeMap::new();
        desired.insert("LOCALE".to_string(), "en_US".to_string());
        desired.insert("CLIENT".to_string(), "utf8".to_string());
        let mut observed = BTreeMap::new();
        observed.insert("LOCALE".to_string(), "en_GB".to_string());
        observed.insert("TIME ZONE".to_string(), "UTC".to_string());

        let diff = map_diff(&desired, &observed);
        assert_eq!(diff.to_set.get("LOCALE"), Some(&"en_US".to_string()));
        assert_eq!(diff.to_set.get("CLIENT"), Some(&"utf8".to_string()));
        assert_eq!(diff.to_clear, vec!["TIME ZONE".to_string()]);
    }

    #[test]
    fn password_drift_detects_mismatch() {
        assert!(password_drift("new", "old"));
        assert!(!password_drift("same", "same"));
    }

    #[test]
    fn externally_changed_tolerates_small_skew() {
        let created = chrono::Utc::now();
        let changed = created + chrono::Duration::seconds(1);
        assert!(!externally_changed(created, Some(changed), chrono::Duration::seconds(3)));
        let changed_late = created + chrono::Duration::seconds(10);
        assert!(externally_changed(created, Some(changed_late), chrono::Duration::seconds(3)));
    }
}
