/// Debounced discrete input driving the pedal (button, key, GPIO line).
pub trait TriggerSource {
    /// Non-blocking. True on a debounced rising edge since the previous poll.
    fn poll(&mut self) -> bool;
}

impl<T: TriggerSource + ?Sized> TriggerSource for Box<T> {
    fn poll(&mut self) -> bool {
        (**self).poll()
    }
}
