//! Ownership of native resources acquired while opening a session.
//!
//! A [`NativeGuard`] holds one resource and gives it back exactly once:
//! explicitly through [`NativeGuard::release`], or implicitly on drop.
//! Multi-step handshakes keep one guard per acquired resource, so an early
//! return after a partial failure drops whatever was already obtained.

use crate::error::{Result, SmartError};

/// A raw OS resource that must be returned to the system.
pub trait NativeHandle {
    /// Return the resource. The guard calls this at most once per value.
    fn release(self);
}

#[derive(Debug)]
pub struct NativeGuard<H: NativeHandle> {
    handle: Option<H>,
}

impl<H: NativeHandle> NativeGuard<H> {
    pub fn new(handle: H) -> Self {
        Self { handle: Some(handle) }
    }

    /// The wrapped resource, or `None` once released.
    pub fn get(&self) -> Option<&H> {
        self.handle.as_ref()
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }

    /// Release now. Later calls, and the eventual drop, do nothing.
    pub fn release(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.release();
        }
    }
}

impl<H: NativeHandle> Drop for NativeGuard<H> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Two-step acquisition where the second resource is obtained through the
/// first, as with a plugin factory followed by `QueryInterface`.
pub trait Handshake {
    type Outer: NativeHandle;
    type Inner: NativeHandle;

    fn create(&mut self) -> Result<Self::Outer>;

    fn query(&mut self, outer: &Self::Outer) -> Result<Self::Inner>;
}

/// Run both steps. The pair comes back inner first so that dropping it in
/// order releases inner before outer. When the query fails the outer
/// resource has already been released by the time the error is returned.
pub fn acquire<S: Handshake>(steps: &mut S) -> Result<(NativeGuard<S::Inner>, NativeGuard<S::Outer>)> {
    let outer = NativeGuard::new(steps.create()?);
    let inner = match outer.get() {
        Some(handle) => steps.query(handle)?,
        None         => return Err(SmartError::InterfaceUnavailable("released handle")),
    };
    Ok((NativeGuard::new(inner), outer))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct Counted(Rc<Cell<u32>>);

    impl NativeHandle for Counted {
        fn release(self) {
            self.0.set(self.0.get() + 1);
        }
    }

    #[test]
    fn release_is_idempotent() {
        let count = Rc::new(Cell::new(0));
        let mut guard = NativeGuard::new(Counted(count.clone()));
        assert!(!guard.is_released());

        guard.release();
        guard.release();
        drop(guard);

        assert_eq!(count.get(), 1);
    }

    #[test]
    fn drop_releases() {
        let count = Rc::new(Cell::new(0));
        {
            let _guard = NativeGuard::new(Counted(count.clone()));
        }
        assert_eq!(count.get(), 1);
    }

    /// Records every release, tagged by which side it was.
    #[derive(Debug)]
    struct Tagged(&'static str, Rc<RefCell<Vec<&'static str>>>);

    impl NativeHandle for Tagged {
        fn release(self) {
            self.1.borrow_mut().push(self.0);
        }
    }

    struct Steps {
        log:        Rc<RefCell<Vec<&'static str>>>,
        create_ok:  bool,
        query_ok:   bool,
        queried_on: Option<&'static str>,
    }

    impl Steps {
        fn new(create_ok: bool, query_ok: bool) -> Self {
            Self { log: Rc::default(), create_ok, query_ok, queried_on: None }
        }
    }

    impl Handshake for Steps {
        type Outer = Tagged;
        type Inner = Tagged;

        fn create(&mut self) -> Result<Tagged> {
            if !self.create_ok {
                return Err(SmartError::IoKit { op: "create", code: -1 });
            }
            Ok(Tagged("outer", self.log.clone()))
        }

        fn query(&mut self, outer: &Tagged) -> Result<Tagged> {
            self.queried_on = Some(outer.0);
            if !self.query_ok {
                return Err(SmartError::InterfaceUnavailable("inner"));
            }
            Ok(Tagged("inner", self.log.clone()))
        }
    }

    #[test]
    fn failed_query_releases_outer_once() {
        let mut steps = Steps::new(true, false);
        let err = acquire(&mut steps).unwrap_err();

        assert!(matches!(err, SmartError::InterfaceUnavailable("inner")));
        assert_eq!(steps.queried_on, Some("outer"));
        assert_eq!(*steps.log.borrow(), vec!["outer"]);
    }

    #[test]
    fn failed_create_releases_nothing() {
        let mut steps = Steps::new(false, true);
        assert!(acquire(&mut steps).is_err());
        assert_eq!(steps.queried_on, None);
        assert!(steps.log.borrow().is_empty());
    }

    #[test]
    fn acquired_pair_releases_inner_then_outer() {
        let mut steps = Steps::new(true, true);
        let pair = acquire(&mut steps).unwrap();
        assert!(steps.log.borrow().is_empty());

        drop(pair);
        assert_eq!(*steps.log.borrow(), vec!["inner", "outer"]);
    }
}
