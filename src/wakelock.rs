/// Advisory screen/resource lock requested while a timer runs.
///
/// Hosts may ignore it entirely; timer correctness never depends on the lock
/// being honored, because elapsed time is derived from wall-clock instants.
pub trait WakeLock {
    fn acquire(&mut self);
    fn release(&mut self);
}

/// Default lock that does nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopWakeLock;

impl WakeLock for NoopWakeLock {
    fn acquire(&mut self) {}
    fn release(&mut self) {}
}
