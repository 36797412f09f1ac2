use crate::models::error::LoopError;
use crate::models::state::LoopState;
use crate::models::take::TakeSummary;

/// Event delegate for loop controller notifications.
///
/// All methods are called from the control thread, never from the audio callback.
pub trait LoopDelegate: Send + Sync {
    /// Called after every completed transition.
    fn on_state_changed(&self, state: LoopState);

    /// Called when a recording has been frozen and is about to loop.
    fn on_take_frozen(&self, take: &TakeSummary);

    /// Called before a fatal error is returned to the caller.
    fn on_error(&self, error: &LoopError);
}
