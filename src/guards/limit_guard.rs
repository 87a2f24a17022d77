use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use rocket_governor::{Method, Quota, RocketGovernable};

use crate::config::WRITE_COOLDOWN;

pub struct TenPerSecond;

impl<'r> RocketGovernable<'r> for TenPerSecond {
    fn quota(_method: Method, _route_name: &str) -> Quota {
        Quota::per_second(Self::nonzero(10))
    }
}

/// Per-user spacing between posts and comments.
///
/// Lives in process memory only: it starts empty on every boot and is not
/// shared between instances.
pub struct Cooldown {
    window: Duration,
    last: Mutex<HashMap<String, Instant>>,
}

impl Default for Cooldown {
    fn default() -> Self {
        Cooldown::new(WRITE_COOLDOWN)
    }
}

impl Cooldown {
    pub fn new(window: Duration) -> Self {
        Cooldown {
            window,
            last: Mutex::new(HashMap::new()),
        }
    }

    fn last(&self) -> std::sync::MutexGuard<'_, HashMap<String, Instant>> {
        self.last.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// How long `user` still has to wait at `now`, if their last write is inside the window.
    pub fn check_at(&self, user: &str, now: Instant) -> Result<(), Duration> {
        match self.last().get(&user.to_ascii_lowercase()) {
            Some(previous) => {
                let elapsed = now.saturating_duration_since(*previous);
                if elapsed < self.window {
                    Err(self.window - elapsed)
                } else {
                    Ok(())
                }
            }
            None => Ok(()),
        }
    }

    /// Starts `user`'s window at `now`. Called once their write has been saved.
    pub fn record_at(&self, user: &str, now: Instant) {
        let mut last = self.last();
        // keep the map from growing without bound
        let window = self.window;
        last.retain(|_, at| now.saturating_duration_since(*at) < window);
        last.insert(user.to_ascii_lowercase(), now);
    }

    pub fn check(&self, user: &str) -> Result<(), Duration> {
        self.check_at(user, Instant::now())
    }

    pub fn record(&self, user: &str) {
        self.record_at(user, Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_write_inside_window_waits() {
        let cooldown = Cooldown::new(Duration::from_secs(4));
        let start = Instant::now();

        assert!(cooldown.check_at("octo", start).is_ok());
        cooldown.record_at("octo", start);
        let wait = cooldown
            .check_at("Octo", start + Duration::from_secs(1))
            .unwrap_err();
        assert_eq!(wait, Duration::from_secs(3));

        assert!(cooldown.check_at("other", start).is_ok());
        assert!(cooldown
            .check_at("octo", start + Duration::from_secs(4))
            .is_ok());
    }

    #[test]
    fn checking_alone_does_not_start_the_window() {
        let cooldown = Cooldown::new(Duration::from_secs(4));
        let start = Instant::now();

        assert!(cooldown.check_at("octo", start).is_ok());
        assert!(cooldown.check_at("octo", start + Duration::from_secs(1)).is_ok());
    }
}
