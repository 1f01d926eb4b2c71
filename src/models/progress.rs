//! Process-wide unlock state that survives sessions.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GlobalUnlockState {
    /// Granted by the first zero-miss run on any chart. Never revoked.
    pub legendary_unlocked: bool,
}

impl GlobalUnlockState {
    /// Grants the legendary unlock. Returns `true` only the first time.
    pub fn grant_legendary(&mut self) -> bool {
        if self.legendary_unlocked {
            return false;
        }
        self.legendary_unlocked = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grant_is_idempotent() {
        let mut unlocks = GlobalUnlockState::default();
        assert!(unlocks.grant_legendary());
        assert!(!unlocks.grant_legendary());
        assert!(unlocks.legendary_unlocked);
    }
}
