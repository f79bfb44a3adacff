use std::{
    mem::take,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
};

/// A cloneable cancellation signal shared between the thread that owns a
/// background activity and the threads that need to wait for, or trigger,
/// its shutdown.
///
/// `T` is the value handed to waiters once the signal fires (typically `bool`
/// or `()`).
#[derive(Debug, Clone, Default)]
pub struct Context<T>(Arc<(Mutex<T>, Condvar)>);

impl<T> Context<T>
where
    T: Default,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the cancellation signal and wakes every thread blocked in `wait_condvar`.
    pub fn cancel_all(&self, val: T) -> Result<(), PoisonError<MutexGuard<'_, T>>> {
        let (lck, cvar) = &*self.0;
        let mut lck = lck.lock()?;
        *lck = val;
        cvar.notify_all();
        Ok(())
    }

    /// Blocks until `cancel_all` is called, returning the value it was called with
    /// and resetting the internal state to the default.
    pub fn wait_condvar(&self) -> Result<T, PoisonError<MutexGuard<'_, T>>> {
        let (lck, cvar) = &*self.0;
        let mut lck = lck.lock()?;
        lck = cvar.wait(lck)?;
        let current = take(&mut *lck);
        Ok(current)
    }

    pub(crate) fn get_lock_cvar(&self) -> &(Mutex<T>, Condvar) {
        &self.0
    }

    /// Resets the inner value to `T::default()` without notifying waiters.
    pub fn reset(&self) -> Result<(), PoisonError<MutexGuard<'_, T>>> {
        let (lck, _) = &*self.0;
        let mut lck = lck.lock()?;
        *lck = <T as Default>::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{thread, time::Duration};

    #[test]
    fn cancel_all_wakes_waiting_thread() {
        let ctx: Context<bool> = Context::new();
        let waiter = ctx.clone();

        let handle = thread::spawn(move || waiter.wait_condvar().unwrap());

        thread::sleep(Duration::from_millis(20));
        ctx.cancel_all(true).unwrap();

        assert_eq!(true, handle.join().unwrap());
    }

    #[test]
    fn reset_does_not_notify() {
        let ctx: Context<bool> = Context::new();
        ctx.reset().unwrap();
        assert_eq!(false, *ctx.get_lock_cvar().0.lock().unwrap());
    }
}
