/// What a component did with a key, as seen by the owning view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed, nothing to report
  Handled,
  /// Consumed, with an event for the view
  Event(T),
  /// Not consumed; try the next handler
  NotHandled,
}
