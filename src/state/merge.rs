/// Shallow merge of a partial update into a state value.
///
/// `merge` builds a new state and leaves `self` untouched. Fields the
/// partial does not mention must carry over by identity: an `Arc` field is
/// cloned (same allocation), never rebuilt. Selectors compared with
/// [`Identity`](crate::slice::Identity) rely on this to stay quiet across
/// unrelated updates.
///
/// # Examples
///
/// ```
/// use slice_store::Merge;
/// use std::sync::Arc;
///
/// #[derive(Clone)]
/// struct Settings {
///     volume: u8,
///     theme: Arc<str>,
/// }
///
/// #[derive(Default)]
/// struct SettingsPatch {
///     volume: Option<u8>,
///     theme: Option<Arc<str>>,
/// }
///
/// impl Merge for Settings {
///     type Partial = SettingsPatch;
///
///     fn merge(&self, patch: SettingsPatch) -> Self {
///         Self {
///             volume: patch.volume.unwrap_or(self.volume),
///             theme: patch.theme.unwrap_or_else(|| Arc::clone(&self.theme)),
///         }
///     }
/// }
///
/// let before = Settings { volume: 3, theme: Arc::from("light") };
/// let after = before.merge(SettingsPatch { volume: Some(7), ..Default::default() });
/// assert_eq!(after.volume, 7);
/// assert!(Arc::ptr_eq(&before.theme, &after.theme));
/// ```
pub trait Merge: Sized {
    /// Description of a change: the subset of fields to replace.
    type Partial;

    /// Produce the next state by overlaying `partial` on `self`.
    fn merge(&self, partial: Self::Partial) -> Self;
}
