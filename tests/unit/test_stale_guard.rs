#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use uml_collab_api::services::save_service::{STALE_WRITE_GRACE_SECS, is_stale_write};

    #[test]
    fn test_update_older_than_grace_window_is_stale() {
        let stored = Utc::now();
        let client_seen = stored - Duration::seconds(5);

        assert!(is_stale_write(client_seen, stored));
    }

    #[test]
    fn test_update_within_grace_window_is_accepted() {
        let stored = Utc::now();
        let client_seen = stored - Duration::seconds(1);

        assert!(!is_stale_write(client_seen, stored));
    }

    #[test]
    fn test_exact_grace_boundary_is_accepted() {
        let stored = Utc::now();
        let client_seen = stored - Duration::seconds(STALE_WRITE_GRACE_SECS);

        // the window is exclusive: exactly 3 seconds behind still passes
        assert!(!is_stale_write(client_seen, stored));
    }

    #[test]
    fn test_client_ahead_of_stored_is_never_stale() {
        let stored = Utc::now();
        let client_seen = stored + Duration::seconds(2);

        assert!(!is_stale_write(client_seen, stored));
    }
}
