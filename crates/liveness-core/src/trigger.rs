/// Action fired once a session verifies liveness.
///
/// The session invokes [`fire`](Self::fire) at most once per session; what
/// happens afterwards (photo capture, upload, navigation) and whether it
/// succeeds is the implementor's concern and is never retried.
pub trait CaptureTrigger {
    fn fire(&mut self);
}

impl<F: FnMut()> CaptureTrigger for F {
    fn fire(&mut self) {
        (*self)()
    }
}
