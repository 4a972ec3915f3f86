//! Registry of open telemetry sessions, one per mission.

use std::sync::Arc;

use dashmap::DashSet;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    open: Arc<DashSet<Uuid>>,
}

impl SessionRegistry {
    /// Claim the telemetry slot for a mission.
    ///
    /// Returns `None` if another session already holds it. The slot is freed
    /// when the returned guard is dropped.
    pub fn try_register(&self, mission_id: Uuid) -> Option<SessionGuard> {
        // `insert` is atomic per key: exactly one caller sees `true`.
        if !self.open.insert(mission_id) {
            return None;
        }
        Some(SessionGuard {
            mission_id,
            open: self.open.clone(),
        })
    }

    pub fn is_active(&self, mission_id: Uuid) -> bool {
        self.open.contains(&mission_id)
    }

    pub fn active_count(&self) -> usize {
        self.open.len()
    }
}

pub struct SessionGuard {
    mission_id: Uuid,
    open: Arc<DashSet<Uuid>>,
}

impl SessionGuard {
    pub fn mission_id(&self) -> Uuid {
        self.mission_id
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.open.remove(&self.mission_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_session_per_mission() {
        let registry = SessionRegistry::default();
        let mission = Uuid::new_v4();

        let guard = registry.try_register(mission).expect("first claim");
        assert!(registry.try_register(mission).is_none());
        assert!(registry.try_register(Uuid::new_v4()).is_some());
        assert!(registry.is_active(mission));

        drop(guard);
        assert!(!registry.is_active(mission));
        assert!(registry.try_register(mission).is_some());
    }

    #[test]
    fn count_tracks_live_guards() {
        let registry = SessionRegistry::default();
        let a = registry.try_register(Uuid::new_v4()).unwrap();
        let b = registry.try_register(Uuid::new_v4()).unwrap();
        assert_eq!(registry.active_count(), 2);
        drop(a);
        assert_eq!(registry.active_count(), 1);
        assert_eq!(registry.clone().active_count(), 1);
        drop(b);
        assert_eq!(registry.active_count(), 0);
    }

    #[test]
    fn racing_claims_have_one_winner() {
        use std::sync::Barrier;

        let registry = SessionRegistry::default();
        let mission = Uuid::new_v4();
        let start = Arc::new(Barrier::new(8));
        let hold = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = registry.clone();
                let start = start.clone();
                let hold = hold.clone();
                std::thread::spawn(move || {
                    start.wait();
                    let guard = registry.try_register(mission);
                    let won = guard.is_some();
                    // Keep the winner's guard alive until every thread has tried.
                    hold.wait();
                    won
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(registry.active_count(), 0);
    }
}
