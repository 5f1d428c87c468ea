//! Helpers shared by unit tests that touch process-wide state.

use std::sync::{Mutex, MutexGuard};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serialize tests that read or write environment variables.
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Records the previous value of every variable it changes and restores
/// them on drop. Hold [`lock_env`] for as long as the guard lives.
#[derive(Default)]
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    fn save(&mut self, name: &str) {
        if !self.saved.iter().any(|(n, _)| n == name) {
            self.saved.push((name.to_string(), std::env::var(name).ok()));
        }
    }

    pub fn set(&mut self, name: &str, value: &str) {
        self.save(name);
        unsafe { std::env::set_var(name, value) };
    }

    pub fn remove(&mut self, name: &str) {
        self.save(name);
        unsafe { std::env::remove_var(name) };
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => unsafe { std::env::set_var(&name, v) },
                None => unsafe { std::env::remove_var(&name) },
            }
        }
    }
}
