//! Scoped session ownership.

use std::ops::Deref;
use std::ops::DerefMut;

use tracing::warn;

use super::CodecResult;
use super::Session;

/// Owns a codec session and guarantees it is closed exactly once.
///
/// Call [`SessionGuard::close`] to observe the close result. If the guard is
/// dropped first (early return, `?`, panic unwinding) the session is closed
/// from `Drop` and any failure is logged. The session itself is released
/// when the guard is dropped.
///
/// # Examples
///
/// ```
/// use bttf_core::codec::CodecResult;
/// use bttf_core::codec::Session;
/// use bttf_core::codec::SessionGuard;
///
/// struct Counter(u32);
///
/// impl Session for Counter {
///     fn close(&mut self) -> CodecResult {
///         self.0 += 1;
///         Ok(())
///     }
///
///     fn last_error(&self) -> Option<&str> {
///         None
///     }
/// }
///
/// let guard = SessionGuard::new(Counter(0));
/// let session = guard.close().unwrap();
/// assert_eq!(session.0, 1);
/// ```
#[derive(Debug)]
pub struct SessionGuard<S: Session> {
    session: Option<S>,
    label: &'static str,
}

impl<S: Session> SessionGuard<S> {
    /// Wraps `session`.
    pub fn new(session: S) -> Self {
        Self::labelled(session, "session")
    }

    /// Wraps `session`, naming it in close-failure logs.
    pub fn labelled(session: S, label: &'static str) -> Self {
        Self {
            session: Some(session),
            label,
        }
    }

    /// Closes the session and hands it back for release.
    pub fn close(mut self) -> CodecResult<S> {
        let mut session = self.take();
        session.close()?;
        Ok(session)
    }

    fn take(&mut self) -> S {
        match self.session.take() {
            Some(session) => session,
            // `session` is only emptied by `close` and `drop`, which both
            // consume the guard.
            None => unreachable!("session guard used after close"),
        }
    }
}

impl<S: Session> Deref for SessionGuard<S> {
    type Target = S;

    fn deref(&self) -> &S {
        match &self.session {
            Some(session) => session,
            None => unreachable!("session guard used after close"),
        }
    }
}

impl<S: Session> DerefMut for SessionGuard<S> {
    fn deref_mut(&mut self) -> &mut S {
        match &mut self.session {
            Some(session) => session,
            None => unreachable!("session guard used after close"),
        }
    }
}

impl<S: Session> Drop for SessionGuard<S> {
    fn drop(&mut self) {
        if let Some(mut session) = self.session.take()
            && let Err(e) = session.close()
        {
            warn!(session = self.label, error = %e, "failed to close session");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::codec::CodecError;
    use std::cell::Cell;
    use std::rc::Rc;

    struct Probe {
        closes: Rc<Cell<u32>>,
        drops: Rc<Cell<u32>>,
        fail: bool,
    }

    impl Session for Probe {
        fn close(&mut self) -> CodecResult {
            self.closes.set(self.closes.get() + 1);
            if self.fail {
                Err(CodecError::State("close failed"))
            } else {
                Ok(())
            }
        }

        fn last_error(&self) -> Option<&str> {
            None
        }
    }

    impl Drop for Probe {
        fn drop(&mut self) {
            self.drops.set(self.drops.get() + 1);
        }
    }

    fn probe(fail: bool) -> (Probe, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let closes = Rc::new(Cell::new(0));
        let drops = Rc::new(Cell::new(0));
        let probe = Probe {
            closes: Rc::clone(&closes),
            drops: Rc::clone(&drops),
            fail,
        };
        (probe, closes, drops)
    }

    #[test]
    fn test_drop_closes_once() {
        let (session, closes, drops) = probe(false);
        drop(SessionGuard::new(session));
        assert_eq!(closes.get(), 1);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_explicit_close_does_not_close_again() {
        let (session, closes, drops) = probe(false);
        let released = SessionGuard::new(session).close().unwrap();
        assert_eq!(closes.get(), 1);
        assert_eq!(drops.get(), 0);
        drop(released);
        assert_eq!(closes.get(), 1);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_failed_close_still_releases() {
        let (session, closes, drops) = probe(true);
        let result = SessionGuard::new(session).close();
        assert!(result.is_err());
        assert_eq!(closes.get(), 1);
        assert_eq!(drops.get(), 1);
    }

    #[test]
    fn test_failed_close_on_drop_is_swallowed() {
        let (session, closes, drops) = probe(true);
        drop(SessionGuard::labelled(session, "probe"));
        assert_eq!(closes.get(), 1);
        assert_eq!(drops.get(), 1);
    }
}
